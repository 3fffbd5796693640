//! MOD-t frame encoding and response decoding.
//!
//! Requests are compact JSON objects. Two-way commands sent to the control
//! endpoint are terminated by a single `;`, frames sent to the file
//! endpoint are bare JSON:
//!
//! ```text
//! control (EP 2):  {"transport":{...},"data":{"command":{...}}};
//! file    (EP 4):  {"metadata":{"version":1,"type":"status"}}
//! file    (EP 4):  {"metadata":{"version":1,"type":"file_push"},
//!                   "file_push":{"size":N,"adler32":C,"job_id":""}}
//! ```
//!
//! Responses are opaque bytes assembled from 64-byte transfers; [`Response`]
//! keeps them verbatim and offers text and JSON views for display.

use serde::Serialize;
use std::fmt;

use crate::error::Result;

/// Protocol version carried in every metadata header.
pub const PROTOCOL_VERSION: u32 = 1;

/// Terminator appended to two-way control frames.
pub const FRAME_TERMINATOR: u8 = b';';

/// Metadata header shared by file endpoint frames.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Metadata {
    /// Protocol version, always [`PROTOCOL_VERSION`].
    pub version: u32,
    /// Message type (`"status"`, `"file_push"`).
    #[serde(rename = "type")]
    pub kind: &'static str,
}

impl Metadata {
    fn new(kind: &'static str) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            kind,
        }
    }
}

/// Body of a file push announcement.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FilePush {
    /// Payload size in bytes.
    pub size: usize,
    /// Adler-32 of the complete payload.
    pub adler32: u32,
    /// Job identifier, empty when unused.
    pub job_id: String,
}

/// File push metadata frame announcing an upload.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FilePushFrame {
    metadata: Metadata,
    file_push: FilePush,
}

impl FilePushFrame {
    /// Build the announcement for a payload of `size` bytes.
    pub fn new(size: usize, adler32: u32, job_id: impl Into<String>) -> Self {
        Self {
            metadata: Metadata::new("file_push"),
            file_push: FilePush {
                size,
                adler32,
                job_id: job_id.into(),
            },
        }
    }

    /// The file push body.
    pub fn file_push(&self) -> &FilePush {
        &self.file_push
    }

    /// Encode as compact JSON, field order preserved.
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}

/// Status request frame.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct StatusFrame {
    metadata: Metadata,
}

impl Default for StatusFrame {
    fn default() -> Self {
        Self {
            metadata: Metadata::new("status"),
        }
    }
}

impl StatusFrame {
    /// Encode as compact JSON.
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}

/// Append the control frame terminator to a JSON body.
pub fn terminate(body: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(body.len() + 1);
    frame.extend_from_slice(body);
    frame.push(FRAME_TERMINATOR);
    frame
}

/// Check that a frame is a JSON object, optionally followed by one terminator.
pub fn is_well_formed(frame: &[u8]) -> bool {
    let body = frame
        .strip_suffix(&[FRAME_TERMINATOR])
        .unwrap_or(frame);
    matches!(
        serde_json::from_slice::<serde_json::Value>(body),
        Ok(serde_json::Value::Object(_))
    )
}

/// A complete response assembled from one or more bulk transfers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Response {
    bytes: Vec<u8>,
}

impl Response {
    /// Wrap raw response bytes.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Raw bytes as received.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consume the response and return its raw bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Number of bytes received.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the device sent nothing.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Lossy text view for display.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }

    /// Parse the response as JSON.
    ///
    /// Trailing NUL padding, whitespace and a frame terminator are ignored.
    /// Returns `None` when the payload is not JSON.
    pub fn json(&self) -> Option<serde_json::Value> {
        let mut body = self.bytes.as_slice();
        while let Some((&last, rest)) = body.split_last() {
            if last == 0 || last == FRAME_TERMINATOR || last.is_ascii_whitespace() {
                body = rest;
            } else {
                break;
            }
        }
        serde_json::from_slice(body).ok()
    }
}

impl From<Vec<u8>> for Response {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}

impl AsRef<[u8]> for Response {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.bytes))
    }
}
