//! Splits a chunked byte stream into delimiter-terminated candidate frames.

use bytes::{Buf, Bytes, BytesMut};
use tracing::{debug, warn};

use crate::codec::DELIMITER;

const INITIAL_BUFFER_CAPACITY: usize = 1024;

/// Incremental frame splitter.
///
/// Bytes are buffered across calls until a delimiter arrives. Only the bytes
/// between delimiters are handed out; the delimiters themselves and empty
/// chunks (back-to-back delimiters) are consumed silently.
#[derive(Debug, Clone)]
pub struct Reassembler {
    buf: BytesMut,
    max_buffer_size: Option<usize>,
    /// Set after an overflow: input is dropped up to the next delimiter.
    resyncing: bool,
}

impl Reassembler {
    /// Create a reassembler with an unbounded buffer.
    pub fn new() -> Self {
        Self::with_max_buffer(None)
    }

    /// Create a reassembler whose unterminated tail may not exceed `max` bytes.
    pub fn with_max_buffer(max: Option<usize>) -> Self {
        Self {
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            max_buffer_size: max,
            resyncing: false,
        }
    }

    /// Append `input` and return an iterator over the complete chunks now available.
    ///
    /// The iterator drains lazily; chunks it does not yield stay buffered
    /// and are returned by later calls.
    pub fn feed(&mut self, input: &[u8]) -> Chunks<'_> {
        let discarded = self.extend(input);
        if discarded > 0 {
            warn!(discarded, "reassembly buffer overflow, resynchronising");
        }
        Chunks { reassembler: self }
    }

    /// Append `input` to the buffer.
    ///
    /// Returns the number of bytes dropped because of the buffer cap.
    pub fn extend(&mut self, input: &[u8]) -> usize {
        let mut input = input;
        let mut discarded = 0usize;

        if self.resyncing {
            match input.iter().position(|&b| b == DELIMITER) {
                Some(pos) => {
                    discarded += pos;
                    input = &input[pos + 1..];
                    self.resyncing = false;
                    debug!(dropped = pos, "resynchronised on delimiter");
                }
                None => return input.len(),
            }
        }

        self.buf.extend_from_slice(input);

        if let Some(max) = self.max_buffer_size {
            let tail_start = self
                .buf
                .iter()
                .rposition(|&b| b == DELIMITER)
                .map_or(0, |pos| pos + 1);
            let tail = self.buf.len() - tail_start;
            if tail > max {
                self.buf.truncate(tail_start);
                self.resyncing = true;
                discarded += tail;
            }
        }

        discarded
    }

    /// Extract the next non-empty delimited chunk, if one is complete.
    pub fn next_chunk(&mut self) -> Option<Bytes> {
        loop {
            let pos = self.buf.iter().position(|&b| b == DELIMITER)?;
            let chunk = self.buf.split_to(pos).freeze();
            self.buf.advance(1);
            if !chunk.is_empty() {
                return Some(chunk);
            }
        }
    }

    /// Number of buffered bytes not yet handed out.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    /// Take the buffered bytes of the unterminated tail, leaving the buffer empty.
    pub fn take_pending(&mut self) -> Bytes {
        self.resyncing = false;
        self.buf.split().freeze()
    }

    /// Drop all buffered bytes.
    pub fn clear(&mut self) {
        self.buf.clear();
        self.resyncing = false;
    }
}

impl Default for Reassembler {
    fn default() -> Self {
        Self::new()
    }
}

/// Chunks made available by one [`Reassembler::feed`] call.
pub struct Chunks<'a> {
    reassembler: &'a mut Reassembler,
}

impl Iterator for Chunks<'_> {
    type Item = Bytes;

    fn next(&mut self) -> Option<Bytes> {
        self.reassembler.next_chunk()
    }
}
