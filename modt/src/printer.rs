//! MOD-t printer session.
//!
//! A [`Printer`] owns the transport for the lifetime of the session and
//! serializes every request through `&mut self`; the printer handles one
//! in-flight request per endpoint.
//!
//! ## Example
//!
//! ```rust,no_run
//! use modt::{Command, Printer, UploadJob, UsbConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut printer = Printer::open(&UsbConfig::default())?;
//!
//!     if let Some(version) = printer.send_command(Command::BioVersion)? {
//!         println!("{version}");
//!     }
//!
//!     let job = UploadJob::from_file("benchy.gcode")?;
//!     printer.upload(&job, |_| {})?;
//!
//!     println!("{}", printer.status()?);
//!     Ok(())
//! }
//! ```

use log::{debug, info};
use std::ops::ControlFlow;
use std::thread;
use std::time::{Duration, Instant};

use crate::command::{Command, endpoint};
use crate::device::INIT_SEQUENCE;
use crate::error::{Error, Result};
use crate::protocol::frame::Response;
use crate::protocol::response::read_response;
use crate::protocol::upload::{BulkUploader, UploadConfig, UploadEvent, UploadJob, UploadSummary};
use crate::transport::Transport;

/// Default pause between status polls.
pub const DEFAULT_STATUS_INTERVAL: Duration = Duration::from_secs(5);

/// Longest uninterrupted sleep while waiting between status polls.
const SLEEP_SLICE: Duration = Duration::from_millis(100);

/// An initialized connection to a MOD-t.
pub struct Printer<T: Transport> {
    transport: T,
}

impl<T: Transport> Printer<T> {
    /// Take ownership of an opened transport and send the init sequence.
    pub fn connect(mut transport: T) -> Result<Self> {
        debug!("Sending init sequence {INIT_SEQUENCE:02x?}");
        transport.write(endpoint::CONTROL_OUT, &INIT_SEQUENCE)?;
        Ok(Self { transport })
    }

    /// Open a transport with `open` and connect to it.
    ///
    /// Errors from `open` (e.g. [`Error::DeviceNotFound`]) are returned
    /// before any I/O takes place.
    pub fn open_with<F>(open: F) -> Result<Self>
    where
        F: FnOnce() -> Result<T>,
    {
        let transport = open()?;
        Self::connect(transport)
    }

    /// Get a reference to the underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Get a mutable reference to the underlying transport.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Consume the session and return the underlying transport.
    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Write a raw frame to an OUT endpoint.
    pub fn write(&mut self, endpoint: u8, data: &[u8]) -> Result<()> {
        self.transport.write(endpoint, data)
    }

    /// Read one complete response from an IN endpoint.
    pub fn read(&mut self, endpoint: u8) -> Result<Response> {
        read_response(&mut self.transport, endpoint).map(Response::new)
    }

    /// Send a catalog command and collect its reply, if it has one.
    pub fn send_command(&mut self, command: Command) -> Result<Option<Response>> {
        let payload = command.payload();
        debug!(
            "Sending {command} to endpoint {:#04x}: {}",
            payload.endpoint,
            String::from_utf8_lossy(payload.body)
        );
        self.transport
            .write(payload.endpoint, payload.body)?;

        command
            .response_endpoint()
            .map(|ep| self.read(ep))
            .transpose()
    }

    /// Query the printer status once.
    pub fn status(&mut self) -> Result<Response> {
        self.send_command(Command::Status)?
            .ok_or_else(|| Error::Unsupported("status command has no reply endpoint".into()))
    }

    /// Push a print job with the default block size and status cadence.
    pub fn upload<F>(&mut self, job: &UploadJob, on_event: F) -> Result<UploadSummary>
    where
        F: FnMut(UploadEvent<'_>),
    {
        self.upload_with_config(job, UploadConfig::default(), on_event)
    }

    /// Push a print job with custom upload settings.
    pub fn upload_with_config<F>(
        &mut self,
        job: &UploadJob,
        config: UploadConfig,
        on_event: F,
    ) -> Result<UploadSummary>
    where
        F: FnMut(UploadEvent<'_>),
    {
        info!(
            "Uploading {} bytes (adler32 {}, job id {:?})",
            job.size(),
            job.checksum(),
            job.job_id()
        );
        BulkUploader::with_config(&mut self.transport, config).upload(job, on_event)
    }

    /// Poll the printer status, once or repeatedly.
    ///
    /// With `repeat` unset exactly one status request is issued. Otherwise
    /// the printer is polled every `interval` until `on_status` returns
    /// [`ControlFlow::Break`] or the interrupt checker fires, in which case
    /// [`Error::Interrupted`] is returned. Returns the number of polls.
    pub fn poll_status<F>(&mut self, repeat: bool, interval: Duration, mut on_status: F) -> Result<usize>
    where
        F: FnMut(&Response) -> ControlFlow<()>,
    {
        let mut polls = 0;

        loop {
            if repeat && crate::is_interrupted_requested() {
                return Err(Error::Interrupted);
            }

            let status = self.status()?;
            polls += 1;

            if on_status(&status).is_break() || !repeat {
                return Ok(polls);
            }

            if sleep_interruptible(interval) {
                return Err(Error::Interrupted);
            }
        }
    }
}

#[cfg(feature = "native")]
impl Printer<crate::transport::UsbTransport> {
    /// Open the first attached MOD-t and initialize it.
    pub fn open(config: &crate::transport::UsbConfig) -> Result<Self> {
        Self::open_with(|| crate::transport::UsbTransport::open(config))
    }
}

/// Sleep for `duration`, waking early when interruption is requested.
///
/// Returns `true` if the sleep was interrupted.
fn sleep_interruptible(duration: Duration) -> bool {
    let deadline = Instant::now() + duration;

    loop {
        if crate::is_interrupted_requested() {
            return true;
        }
        let now = Instant::now();
        if now >= deadline {
            return false;
        }
        thread::sleep((deadline - now).min(SLEEP_SLICE));
    }
}
