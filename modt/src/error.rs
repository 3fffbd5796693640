//! Error types for modt.

use std::io;
use thiserror::Error;

/// Result type for modt operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for modt operations.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error (file operations).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// USB transfer or device error.
    #[cfg(feature = "native")]
    #[error("USB error: {0}")]
    Usb(rusb::Error),

    /// No printer with the expected vendor/product id is attached.
    #[error("No Mod-T detected (looked for {vid:04x}:{pid:04x})")]
    DeviceNotFound {
        /// USB vendor id that was searched for.
        vid: u16,
        /// USB product id that was searched for.
        pid: u16,
    },

    /// A bulk transfer did not complete in time.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// The device accepted fewer bytes than were submitted.
    #[error("Short write on endpoint {endpoint:#04x}: wrote {actual} of {expected} bytes")]
    ShortWrite {
        /// Endpoint address of the write.
        endpoint: u8,
        /// Number of bytes submitted.
        expected: usize,
        /// Number of bytes the device accepted.
        actual: usize,
    },

    /// Frame serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The operation was cancelled by the embedding application.
    #[error("Operation interrupted")]
    Interrupted,

    /// Unsupported operation.
    #[error("Unsupported: {0}")]
    Unsupported(String),
}

#[cfg(feature = "native")]
impl From<rusb::Error> for Error {
    fn from(err: rusb::Error) -> Self {
        match err {
            rusb::Error::Timeout => Self::Timeout("USB transfer timed out".into()),
            other => Self::Usb(other),
        }
    }
}

impl Error {
    /// Whether the error is a bounded-wait timeout the caller may retry.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}
