//! Adler-32 checksum used by the file push protocol.
//!
//! The printer validates uploads against the Adler-32 of the whole job. The
//! checksum is chainable: feeding the payload in any number of slices gives
//! the same value as a single pass, so large jobs are summed in bounded
//! windows.

/// Window size used when checksumming upload payloads.
pub const CHECKSUM_WINDOW: usize = 256 * 1024 * 1024;

/// Largest prime smaller than 2^16.
const MOD_ADLER: u32 = 65521;

/// Largest n such that 255n(n+1)/2 + (n+1)(MOD_ADLER-1) fits in a u32.
const NMAX: usize = 5552;

/// Running Adler-32 state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Adler32 {
    a: u32,
    b: u32,
}

impl Default for Adler32 {
    fn default() -> Self {
        Self::new()
    }
}

impl Adler32 {
    /// Fresh state (checksum value 1).
    pub fn new() -> Self {
        Self { a: 1, b: 0 }
    }

    /// Resume from a checksum produced by an earlier pass.
    pub fn from_checksum(checksum: u32) -> Self {
        Self {
            a: checksum & 0xFFFF,
            b: checksum >> 16,
        }
    }

    /// Feed more bytes into the checksum.
    pub fn update(&mut self, data: &[u8]) {
        let (mut a, mut b) = (self.a, self.b);

        // Reduce once per NMAX bytes instead of once per byte
        for chunk in data.chunks(NMAX) {
            for &byte in chunk {
                a += u32::from(byte);
                b += a;
            }
            a %= MOD_ADLER;
            b %= MOD_ADLER;
        }

        self.a = a;
        self.b = b;
    }

    /// Current checksum value.
    pub fn checksum(&self) -> u32 {
        (self.b << 16) | self.a
    }
}

/// Adler-32 of `data` in a single pass.
pub fn adler32(data: &[u8]) -> u32 {
    let mut state = Adler32::new();
    state.update(data);
    state.checksum()
}

/// Adler-32 of `data`, summed `window` bytes at a time.
///
/// Each window is seeded with the checksum of the previous one. A `window`
/// of zero is treated as one window spanning all of `data`.
pub fn adler32_windowed(data: &[u8], window: usize) -> u32 {
    if window == 0 {
        return adler32(data);
    }

    data.chunks(window)
        .fold(1, |checksum, slice| {
            let mut state = Adler32::from_checksum(checksum);
            state.update(slice);
            state.checksum()
        })
}
