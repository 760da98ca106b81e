//! CR/LF stream framing
//!
//! The controller terminates every record with CR LF. [`StreamFramer`] is the
//! incremental byte-at-a-time accumulator; [`FrameStream`] drives it from a
//! blocking byte source and yields frames lazily until the source ends.

use super::constants::{DEFAULT_FRAME_CAPACITY, DELIMITER_CR, DELIMITER_LF};
use std::io::Read;

/// One delimiter-bounded telemetry message, trailing CR stripped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    bytes: Vec<u8>,
}

impl Frame {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl From<Vec<u8>> for Frame {
    fn from(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }
}

/// Incremental framer with a fixed-capacity accumulation buffer.
///
/// A delimiter is recognized when the incoming byte is LF, the offset is
/// nonzero and the previously buffered byte is CR; the emitted frame excludes
/// that CR. If the buffer fills without a delimiter it is silently reset and
/// accumulation restarts with the current byte — deliberate data loss, the
/// stream resynchronizes on the next delimiter.
pub struct StreamFramer {
    buffer: Vec<u8>,
    offset: usize,
}

impl StreamFramer {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_FRAME_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: vec![0u8; capacity],
            offset: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Feed one byte; returns a completed frame when the byte closes one.
    pub fn push(&mut self, byte: u8) -> Option<Frame> {
        // Delimiter check runs before the capacity reset so a frame of
        // exactly capacity-1 bytes still makes it out.
        if self.offset > 0 && byte == DELIMITER_LF && self.buffer[self.offset - 1] == DELIMITER_CR {
            let frame = Frame::from(self.buffer[..self.offset - 1].to_vec());
            log::debug!("Received a message with {} bytes", frame.len());
            self.offset = 0;
            return Some(frame);
        }

        if self.offset >= self.buffer.len() {
            log::debug!(
                "No delimiter within {} bytes, dropping accumulated data",
                self.offset
            );
            self.offset = 0;
        }

        self.buffer[self.offset] = byte;
        self.offset += 1;
        None
    }
}

impl Default for StreamFramer {
    fn default() -> Self {
        Self::new()
    }
}

/// Lazy, unbounded, non-restartable frame sequence over a byte source.
///
/// Reads one byte at a time with a blocking read. The sequence ends when the
/// source reports EOF or any read error; a failed read is stream
/// termination, never a per-frame error.
pub struct FrameStream<R: Read> {
    source: R,
    framer: StreamFramer,
}

impl<R: Read> FrameStream<R> {
    pub fn new(source: R, capacity: usize) -> Self {
        Self {
            source,
            framer: StreamFramer::with_capacity(capacity),
        }
    }
}

impl<R: Read> Iterator for FrameStream<R> {
    type Item = Frame;

    fn next(&mut self) -> Option<Frame> {
        let mut byte = [0u8; 1];
        loop {
            match self.source.read(&mut byte) {
                Ok(0) => {
                    log::debug!("Byte source closed, ending frame stream");
                    return None;
                }
                Ok(_) => {
                    if let Some(frame) = self.framer.push(byte[0]) {
                        return Some(frame);
                    }
                }
                Err(e) => {
                    log::debug!("Byte source read failed ({}), ending frame stream", e);
                    return None;
                }
            }
        }
    }
}
