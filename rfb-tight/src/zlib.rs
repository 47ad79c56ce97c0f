//! The four persistent zlib streams of a Tight session.
//!
//! A Tight server keeps one deflate context per stream id for the whole
//! session and only starts a fresh one when the control byte of a rectangle
//! asks for it. The client mirrors that: a slot is `None` until first use or
//! after a reset, and otherwise keeps its inflate window between rectangles.

use crate::TightError;
use flate2::{Decompress, FlushDecompress, Status};
use std::fmt;

/// Number of independent zlib streams in the Tight encoding.
pub const ZLIB_STREAM_COUNT: usize = 4;

const INFLATE_CHUNK: usize = 4096;

/// Session-lifetime inflate contexts indexed by stream id.
pub struct ZlibStreamPool {
    streams: [Option<Decompress>; ZLIB_STREAM_COUNT],
}

impl Default for ZlibStreamPool {
    fn default() -> Self {
        Self {
            streams: [None, None, None, None],
        }
    }
}

impl fmt::Debug for ZlibStreamPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let active: Vec<bool> = self.streams.iter().map(Option::is_some).collect();
        f.debug_struct("ZlibStreamPool")
            .field("active", &active)
            .finish()
    }
}

impl ZlibStreamPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Discard the history of one stream.
    pub fn reset(&mut self, stream_id: usize) {
        self.streams[stream_id] = None;
    }

    /// Discard the history of every stream.
    pub fn reset_all(&mut self) {
        self.streams = Default::default();
    }

    /// True when the stream holds inflate state from an earlier rectangle.
    pub fn is_active(&self, stream_id: usize) -> bool {
        self.streams[stream_id].is_some()
    }

    /// Feed one chunk of compressed bytes into a stream.
    ///
    /// Output is appended to `output`, which must never grow beyond `expected`
    /// bytes for the rectangle being decoded. Chunks can be as small as one
    /// byte; the result depends only on the concatenated input.
    pub fn inflate(
        &mut self,
        stream_id: usize,
        input: &[u8],
        output: &mut Vec<u8>,
        expected: usize,
    ) -> Result<(), TightError> {
        let zlib_error = |reason: String| TightError::Zlib { stream_id, reason };
        let stream = self.streams[stream_id].get_or_insert_with(|| Decompress::new(true));

        // Runs until inflate stalls: a full chunk can leave output buffered
        // inside the stream after the last input byte was taken.
        let mut chunk = [0u8; INFLATE_CHUNK];
        let mut consumed = 0;
        loop {
            let before_in = stream.total_in();
            let before_out = stream.total_out();
            let status = stream
                .decompress(&input[consumed..], &mut chunk, FlushDecompress::Sync)
                .map_err(|e| zlib_error(e.to_string()))?;
            let used_in = (stream.total_in() - before_in) as usize;
            let used_out = (stream.total_out() - before_out) as usize;

            if used_in == 0 && used_out == 0 {
                if consumed == input.len() {
                    return Ok(());
                }
                return Err(zlib_error(match status {
                    Status::StreamEnd => format!(
                        "{} bytes of input after end of stream",
                        input.len() - consumed
                    ),
                    _ => "inflate made no progress".to_string(),
                }));
            }

            consumed += used_in;
            output.extend_from_slice(&chunk[..used_out]);
            if output.len() > expected {
                return Err(zlib_error(format!(
                    "inflated more than the expected {} bytes",
                    expected
                )));
            }
        }
    }
}
