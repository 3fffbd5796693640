//! # modt
//!
//! A library for driving the New Matter MOD-t 3D printer over USB.
//!
//! This crate provides the core functionality for talking to the printer's
//! bulk endpoints, including:
//!
//! - The fixed JSON command catalog
//! - Multi-transfer response assembly
//! - Chunked g-code upload with Adler-32 precomputation
//! - Periodic status polling
//!
//! ## Features
//!
//! - `native` (default): USB transport via `rusb` (libusb)
//!
//! ## Example
//!
//! ```rust,no_run
//! use modt::{Printer, UploadJob, UsbConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let job = UploadJob::from_file("part.gcode")?.with_job_id("part");
//!
//!     #[cfg(feature = "native")]
//!     {
//!         let mut printer = Printer::open(&UsbConfig::default())?;
//!         printer.upload(&job, |_| {})?;
//!         println!("{}", printer.status()?);
//!     }
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

use std::sync::{Arc, OnceLock};

pub mod command;
pub mod device;
pub mod error;
pub mod printer;
pub mod protocol;
pub mod transport;

static INTERRUPT_CHECKER: OnceLock<Arc<dyn Fn() -> bool + Send + Sync>> = OnceLock::new();

/// Register a global interruption checker used by long-running library loops.
///
/// The checker should return `true` when the current operation should stop
/// (for example after receiving Ctrl-C in CLI applications). Only the first
/// registration takes effect.
pub fn set_interrupt_checker<F>(checker: F)
where
    F: Fn() -> bool + Send + Sync + 'static,
{
    let _ = INTERRUPT_CHECKER.set(Arc::new(checker));
}

/// Returns whether interruption was requested by the embedding application.
#[must_use]
pub fn is_interrupted_requested() -> bool {
    INTERRUPT_CHECKER
        .get()
        .is_some_and(|checker| checker())
}

// Re-exports for convenience
#[cfg(feature = "native")]
pub use transport::UsbTransport;
pub use {
    command::{Command, CommandPayload},
    error::{Error, Result},
    printer::{DEFAULT_STATUS_INTERVAL, Printer},
    protocol::{
        Response,
        upload::{UploadConfig, UploadEvent, UploadJob, UploadState, UploadSummary},
    },
    transport::{Transport, UsbConfig},
};
