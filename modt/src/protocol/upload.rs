//! Chunked file push protocol.
//!
//! Print jobs are pushed to the file endpoint in three phases:
//!
//! ```text
//! host                                    printer
//!  |  {"metadata":{..."file_push"},...}  ->  |   EP 4, size + adler32
//!  |  block 0      (5120 bytes)          ->  |   EP 4
//!  |  ...                                    |
//!  |  block 19                           ->  |
//!  |  <- status (read only)                  |   EP 0x83, before block 20
//!  |  block 20                           ->  |
//!  |  ...                                    |
//!  |  last block   (<= 5120 bytes)       ->  |
//! ```
//!
//! The checksum covers the whole payload and is computed before anything is
//! sent. There is no acknowledgement phase: an upload succeeds when every
//! byte was written without a transport error.

use log::{debug, info, trace};
use std::fmt;
use std::path::Path;

use crate::command::endpoint;
use crate::error::{Error, Result};
use crate::protocol::adler::{CHECKSUM_WINDOW, adler32_windowed};
use crate::protocol::frame::{FilePushFrame, Response};
use crate::protocol::response::read_response;
use crate::transport::Transport;

/// Bytes per data block.
pub const BLOCK_SIZE: usize = 5120;

/// Number of blocks sent between status reads.
pub const STATUS_INTERVAL: usize = 20;

/// Upload tuning knobs.
#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// Bytes per data block.
    pub block_size: usize,
    /// Blocks sent before a status read is interleaved.
    pub status_interval: usize,
    /// Endpoint receiving the metadata frame and blocks.
    pub data_endpoint: u8,
    /// Endpoint polled for status during the upload.
    pub status_endpoint: u8,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            block_size: BLOCK_SIZE,
            status_interval: STATUS_INTERVAL,
            data_endpoint: endpoint::FILE_OUT,
            status_endpoint: endpoint::STATUS_IN,
        }
    }
}

/// A print job ready for upload.
#[derive(Debug, Clone)]
pub struct UploadJob {
    data: Vec<u8>,
    checksum: u32,
    job_id: String,
}

impl UploadJob {
    /// Create a job and checksum its payload.
    pub fn new(data: Vec<u8>) -> Self {
        let checksum = adler32_windowed(&data, CHECKSUM_WINDOW);
        debug!("Job checksum: {} bytes, adler32 {checksum}", data.len());
        Self {
            data,
            checksum,
            job_id: String::new(),
        }
    }

    /// Read a job from a file (g-code is sent verbatim).
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = std::fs::read(path.as_ref())?;
        Ok(Self::new(data))
    }

    /// Set the job identifier announced in the metadata frame.
    #[must_use]
    pub fn with_job_id(mut self, job_id: impl Into<String>) -> Self {
        self.job_id = job_id.into();
        self
    }

    /// Payload bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Payload size in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Adler-32 of the complete payload.
    pub fn checksum(&self) -> u32 {
        self.checksum
    }

    /// Job identifier (empty by default).
    pub fn job_id(&self) -> &str {
        &self.job_id
    }
}

/// A contiguous slice `[offset, offset + len)` of the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferWindow {
    /// Start offset in the payload.
    pub offset: usize,
    /// Length in bytes.
    pub len: usize,
}

impl TransferWindow {
    /// One past the last byte of the window.
    pub fn end(&self) -> usize {
        self.offset + self.len
    }

    /// Split `size` bytes into consecutive windows of at most `block_size`.
    ///
    /// # Panics
    ///
    /// Panics if `block_size` is zero.
    pub fn partition(size: usize, block_size: usize) -> impl Iterator<Item = Self> {
        assert!(block_size > 0, "block size must be non-zero");
        (0..size)
            .step_by(block_size)
            .map(move |offset| Self {
                offset,
                len: block_size.min(size - offset),
            })
    }
}

/// Uploader progress through the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadState {
    /// Nothing done yet.
    Idle,
    /// Job checksum known, nothing sent.
    ChecksumComputed,
    /// Metadata frame written.
    MetadataSent,
    /// Blocks are being written.
    Transmitting,
    /// Every block was written.
    Done,
}

impl fmt::Display for UploadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::ChecksumComputed => "checksum computed",
            Self::MetadataSent => "metadata sent",
            Self::Transmitting => "transmitting",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

/// Progress notifications emitted during an upload.
#[derive(Debug)]
pub enum UploadEvent<'a> {
    /// The metadata frame was written.
    Metadata {
        /// Announced payload size.
        size: usize,
        /// Announced checksum.
        checksum: u32,
    },
    /// A data block was written.
    Block {
        /// Zero-based block number.
        index: usize,
        /// Where the block sits in the payload.
        window: TransferWindow,
        /// Block contents.
        data: &'a [u8],
    },
    /// A status read was interleaved.
    Status(&'a Response),
}

/// Outcome of a completed upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadSummary {
    /// Payload bytes written (excluding the metadata frame).
    pub bytes_sent: usize,
    /// Number of data blocks written.
    pub blocks: usize,
    /// Number of status reads interleaved.
    pub status_polls: usize,
    /// Announced checksum.
    pub checksum: u32,
}

/// File push state machine.
pub struct BulkUploader<'a, T: Transport + ?Sized> {
    transport: &'a mut T,
    config: UploadConfig,
    state: UploadState,
    poll_counter: usize,
}

impl<'a, T: Transport + ?Sized> BulkUploader<'a, T> {
    /// Create an uploader with default configuration.
    pub fn new(transport: &'a mut T) -> Self {
        Self::with_config(transport, UploadConfig::default())
    }

    /// Create an uploader with custom configuration.
    pub fn with_config(transport: &'a mut T, config: UploadConfig) -> Self {
        Self {
            transport,
            config,
            state: UploadState::Idle,
            poll_counter: 0,
        }
    }

    /// Current protocol state.
    pub fn state(&self) -> UploadState {
        self.state
    }

    /// Push `job` to the printer.
    ///
    /// Aborts on the first transport error; the uploader then stays in the
    /// state it failed in. No retry or resume is attempted. A zero
    /// `block_size` is rejected with [`Error::Unsupported`] before anything
    /// is written.
    pub fn upload<F>(&mut self, job: &UploadJob, mut on_event: F) -> Result<UploadSummary>
    where
        F: FnMut(UploadEvent<'_>),
    {
        if self.state != UploadState::Idle {
            return Err(Error::Unsupported(format!(
                "uploader already used (state: {})",
                self.state
            )));
        }
        // Rejected before the announcement so the printer never waits on data
        if self.config.block_size == 0 {
            return Err(Error::Unsupported("block size must be non-zero".into()));
        }

        self.state = UploadState::ChecksumComputed;

        let frame = FilePushFrame::new(job.size(), job.checksum(), job.job_id()).encode()?;
        debug!("Sending file push metadata: {}", String::from_utf8_lossy(&frame));
        self.transport
            .write(self.config.data_endpoint, &frame)?;
        self.state = UploadState::MetadataSent;
        on_event(UploadEvent::Metadata {
            size: job.size(),
            checksum: job.checksum(),
        });

        self.state = UploadState::Transmitting;
        let mut summary = UploadSummary {
            bytes_sent: 0,
            blocks: 0,
            status_polls: 0,
            checksum: job.checksum(),
        };

        for (index, window) in TransferWindow::partition(job.size(), self.config.block_size).enumerate() {
            if crate::is_interrupted_requested() {
                return Err(Error::Interrupted);
            }

            self.poll_counter += 1;
            if self.poll_counter > self.config.status_interval {
                let status = Response::new(read_response(
                    &mut *self.transport,
                    self.config.status_endpoint,
                )?);
                trace!("Status before block {index}: {status}");
                summary.status_polls += 1;
                self.poll_counter = 0;
                on_event(UploadEvent::Status(&status));
            }

            let block = &job.data()[window.offset..window.end()];
            debug!(
                "Block {index}: {}-{}, block-size: {}",
                window.offset,
                window.end(),
                window.len
            );
            self.transport
                .write(self.config.data_endpoint, block)?;

            summary.blocks += 1;
            summary.bytes_sent += window.len;
            on_event(UploadEvent::Block {
                index,
                window,
                data: block,
            });
        }

        self.state = UploadState::Done;
        info!(
            "Upload complete: {} bytes in {} blocks ({} status polls)",
            summary.bytes_sent, summary.blocks, summary.status_polls
        );
        Ok(summary)
    }
}
