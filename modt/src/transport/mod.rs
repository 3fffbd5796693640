//! Transport abstraction for USB bulk communication.
//!
//! The protocol layer only ever needs two primitives from the device:
//! a bulk write to an OUT endpoint and a bounded bulk read from an IN
//! endpoint. This module defines them as the [`Transport`] trait so the
//! protocol code stays I/O-agnostic:
//!
//! ```text
//! +---------------------------+
//! |      Protocol Layer       |
//! | (commands, upload, reads) |
//! +-------------+-------------+
//!               |
//!               v
//! +-------------+-------------+
//! |      Transport Trait      |
//! +------+-------------+------+
//!        |             |
//!        v             v
//! +------+------+ +----+--------+
//! | UsbTransport| | in-memory   |
//! |   (rusb)    | | test double |
//! +-------------+ +-------------+
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use modt::transport::Transport;
//!
//! fn example<T: Transport>(transport: &mut T) -> modt::Result<()> {
//!     transport.write(0x04, br#"{"metadata":{"version":1,"type":"status"}}"#)?;
//!     let fragment = transport.read(0x83, 64)?;
//!     println!("Received: {:?}", fragment);
//!     Ok(())
//! }
//! ```

#[cfg(feature = "native")]
pub mod native;

#[cfg(test)]
pub(crate) mod mock;

use std::time::Duration;

use crate::device::{PRODUCT_ID, VENDOR_ID};
use crate::error::Result;

/// Default per-transfer timeout for bulk reads and writes.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// USB connection configuration.
#[derive(Debug, Clone)]
pub struct UsbConfig {
    /// USB vendor id of the printer.
    pub vid: u16,
    /// USB product id of the printer.
    pub pid: u16,
    /// Bound on every individual bulk transfer.
    pub timeout: Duration,
}

impl Default for UsbConfig {
    fn default() -> Self {
        Self {
            vid: VENDOR_ID,
            pid: PRODUCT_ID,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl UsbConfig {
    /// Set the per-transfer timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Bulk transport to the printer.
///
/// Implementations own the device handle exclusively. All calls block and
/// complete in submission order.
pub trait Transport {
    /// Write `data` to the OUT endpoint as one bulk transfer.
    fn write(&mut self, endpoint: u8, data: &[u8]) -> Result<()>;

    /// Read at most `len` bytes from the IN endpoint.
    ///
    /// Returning fewer than `len` bytes (including none) is not an error.
    fn read(&mut self, endpoint: u8, len: usize) -> Result<Vec<u8>>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn write(&mut self, endpoint: u8, data: &[u8]) -> Result<()> {
        (**self).write(endpoint, data)
    }

    fn read(&mut self, endpoint: u8, len: usize) -> Result<Vec<u8>> {
        (**self).read(endpoint, len)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn write(&mut self, endpoint: u8, data: &[u8]) -> Result<()> {
        (**self).write(endpoint, data)
    }

    fn read(&mut self, endpoint: u8, len: usize) -> Result<Vec<u8>> {
        (**self).read(endpoint, len)
    }
}

// Re-export the native implementation when enabled
#[cfg(feature = "native")]
pub use native::UsbTransport;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usb_config_default() {
        let config = UsbConfig::default();
        assert_eq!(config.vid, 0x2b75);
        assert_eq!(config.pid, 0x0002);
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
    }

    #[test]
    fn test_usb_config_builder() {
        let config = UsbConfig::default().with_timeout(Duration::from_millis(250));
        assert_eq!(config.timeout, Duration::from_millis(250));
    }
}
