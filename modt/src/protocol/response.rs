//! Multi-transfer response assembly.
//!
//! The printer answers with messages of arbitrary length split across
//! 64-byte bulk transfers. A full transfer means more data follows; the
//! first short transfer (possibly empty) ends the message and still belongs
//! to it.

use log::trace;

use crate::error::Result;
use crate::transport::Transport;

/// Size of a single IN transfer (the endpoint's max packet size).
pub const READ_CHUNK_SIZE: usize = 64;

/// Read one complete response from `endpoint`.
///
/// Issues reads until one returns fewer than [`READ_CHUNK_SIZE`] bytes. Any
/// transport error aborts the read and discards the fragments gathered so
/// far.
pub fn read_response<T: Transport + ?Sized>(transport: &mut T, endpoint: u8) -> Result<Vec<u8>> {
    let mut message = Vec::new();
    let mut transfers = 0usize;

    loop {
        let fragment = transport.read(endpoint, READ_CHUNK_SIZE)?;
        transfers += 1;
        let more = fragment.len() >= READ_CHUNK_SIZE;
        message.extend_from_slice(&fragment);

        if !more {
            break;
        }
    }

    trace!(
        "Assembled {} byte response from endpoint {endpoint:#04x} in {transfers} transfers",
        message.len()
    );
    Ok(message)
}
