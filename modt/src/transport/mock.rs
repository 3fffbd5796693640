//! In-memory transport used by unit tests.
//!
//! Records every transfer in order and serves scripted read fragments per
//! endpoint. Once an endpoint's script is exhausted its fallback fragment
//! (if any) is returned on every further read.

use std::collections::{HashMap, VecDeque};

use crate::error::{Error, Result};
use crate::transport::Transport;

/// A single recorded transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Op {
    Write { endpoint: u8, data: Vec<u8> },
    Read { endpoint: u8, len: usize },
}

#[derive(Debug, Default)]
pub(crate) struct MockTransport {
    pub(crate) ops: Vec<Op>,
    scripted: HashMap<u8, VecDeque<Vec<u8>>>,
    fallback: HashMap<u8, Vec<u8>>,
    fail_write_at: Option<usize>,
    fail_read_at: Option<usize>,
}

impl MockTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Queue fragments returned by successive reads on `endpoint`.
    pub(crate) fn script<I>(mut self, endpoint: u8, fragments: I) -> Self
    where
        I: IntoIterator<Item = Vec<u8>>,
    {
        self.scripted
            .entry(endpoint)
            .or_default()
            .extend(fragments);
        self
    }

    /// Fragment returned by every read on `endpoint` once the script runs dry.
    pub(crate) fn always(mut self, endpoint: u8, fragment: &[u8]) -> Self {
        self.fallback.insert(endpoint, fragment.to_vec());
        self
    }

    /// Fail the n-th write (zero based, counted across all endpoints).
    pub(crate) fn fail_write_at(mut self, index: usize) -> Self {
        self.fail_write_at = Some(index);
        self
    }

    /// Fail the n-th read (zero based, counted across all endpoints).
    pub(crate) fn fail_read_at(mut self, index: usize) -> Self {
        self.fail_read_at = Some(index);
        self
    }

    pub(crate) fn writes(&self) -> Vec<(u8, &[u8])> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                Op::Write { endpoint, data } => Some((*endpoint, data.as_slice())),
                Op::Read { .. } => None,
            })
            .collect()
    }

    pub(crate) fn reads(&self) -> Vec<(u8, usize)> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                Op::Read { endpoint, len } => Some((*endpoint, *len)),
                Op::Write { .. } => None,
            })
            .collect()
    }
}

impl Transport for MockTransport {
    fn write(&mut self, endpoint: u8, data: &[u8]) -> Result<()> {
        if self.fail_write_at == Some(self.writes().len()) {
            return Err(Error::Timeout("mock write failure".into()));
        }
        self.ops.push(Op::Write {
            endpoint,
            data: data.to_vec(),
        });
        Ok(())
    }

    fn read(&mut self, endpoint: u8, len: usize) -> Result<Vec<u8>> {
        if self.fail_read_at == Some(self.reads().len()) {
            return Err(Error::Timeout("mock read failure".into()));
        }
        self.ops.push(Op::Read { endpoint, len });

        let mut fragment = match self
            .scripted
            .get_mut(&endpoint)
            .and_then(VecDeque::pop_front)
        {
            Some(fragment) => fragment,
            None => self
                .fallback
                .get(&endpoint)
                .cloned()
                .ok_or_else(|| Error::Timeout(format!("no data on endpoint {endpoint:#04x}")))?,
        };
        fragment.truncate(len);
        Ok(fragment)
    }
}
