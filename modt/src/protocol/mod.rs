//! Protocol implementations.

pub mod adler;
pub mod frame;
pub mod response;
pub mod upload;

// Re-export common types
pub use adler::{Adler32, adler32, adler32_windowed};
pub use frame::{FilePushFrame, Response, StatusFrame};
pub use response::{READ_CHUNK_SIZE, read_response};
pub use upload::{
    BLOCK_SIZE, BulkUploader, STATUS_INTERVAL, TransferWindow, UploadConfig, UploadEvent,
    UploadJob, UploadState, UploadSummary,
};
