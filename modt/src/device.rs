//! MOD-t USB identification and bring-up constants.

/// New Matter USB vendor id.
pub const VENDOR_ID: u16 = 0x2b75;

/// MOD-t USB product id (normal firmware, not DFU).
pub const PRODUCT_ID: u16 = 0x0002;

/// Bytes written to the control endpoint right after the configuration is
/// selected. Undocumented; the printer does not answer commands without it.
pub const INIT_SEQUENCE: [u8; 5] = [0x24, 0x6c, 0x00, 0x93, 0xff];
