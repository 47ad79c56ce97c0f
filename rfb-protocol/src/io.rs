//! Non-blocking receive queue for RFB protocol data.
//!
//! Decoders driven by transport readiness events cannot await bytes. Instead,
//! the connection layer appends whatever arrived to an [`RfbInQueue`] and calls
//! the decoder again; every read on the queue either succeeds completely or
//! reports "not enough data" and leaves the queue untouched.
//!
//! # Examples
//!
//! ```
//! use rfb_protocol::io::RfbInQueue;
//!
//! let mut queue = RfbInQueue::new();
//! queue.push(&[0x12]);
//!
//! // A u16 needs two bytes; nothing is consumed yet.
//! assert_eq!(queue.read_uint(2), None);
//! assert_eq!(queue.available(), 1);
//!
//! queue.push(&[0x34]);
//! assert_eq!(queue.read_uint(2), Some(0x1234));
//! assert_eq!(queue.available(), 0);
//! ```

use bytes::{Buf, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};

/// Buffered receive queue with all-or-nothing reads.
///
/// Multi-byte values are read in network byte order (big-endian).
#[derive(Debug, Default)]
pub struct RfbInQueue {
    buffer: BytesMut,
}

impl RfbInQueue {
    /// Create an empty queue with default capacity (8KB).
    pub fn new() -> Self {
        Self::with_capacity(8192)
    }

    /// Create an empty queue with the given initial capacity in bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(capacity),
        }
    }

    /// Append a chunk received from the transport.
    pub fn push(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Perform one read from `reader` and append what arrived.
    ///
    /// Returns the number of bytes appended; 0 means the reader hit EOF.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use rfb_protocol::io::RfbInQueue;
    /// # async fn example<R: tokio::io::AsyncRead + Unpin>(mut socket: R) -> std::io::Result<()> {
    /// let mut queue = RfbInQueue::new();
    /// while queue.fill_from(&mut socket).await? > 0 {
    ///     // hand the queue to the active decoder
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn fill_from<R: AsyncRead + Unpin>(&mut self, reader: &mut R) -> std::io::Result<usize> {
        reader.read_buf(&mut self.buffer).await
    }

    /// Number of bytes currently buffered.
    pub fn available(&self) -> usize {
        self.buffer.len()
    }

    /// True when at least `n` bytes are buffered.
    pub fn has_bytes(&self, n: usize) -> bool {
        self.buffer.len() >= n
    }

    /// Look at the next `n` bytes without consuming them.
    pub fn peek(&self, n: usize) -> Option<&[u8]> {
        self.buffer.get(..n)
    }

    /// Look at the next byte without consuming it.
    pub fn peek_u8(&self) -> Option<u8> {
        self.buffer.first().copied()
    }

    /// Consume exactly `n` bytes, or nothing if fewer are buffered.
    pub fn consume(&mut self, n: usize) -> Option<Bytes> {
        if !self.has_bytes(n) {
            return None;
        }
        Some(self.buffer.split_to(n).freeze())
    }

    /// Consume up to `n` bytes, however many are buffered.
    pub fn take_up_to(&mut self, n: usize) -> Bytes {
        let n = n.min(self.buffer.len());
        self.buffer.split_to(n).freeze()
    }

    /// Read a single byte.
    pub fn read_u8(&mut self) -> Option<u8> {
        if !self.has_bytes(1) {
            return None;
        }
        Some(self.buffer.get_u8())
    }

    /// Read a big-endian unsigned integer `width` bytes wide (1, 2 or 4).
    ///
    /// # Panics
    ///
    /// Panics on any other width.
    pub fn read_uint(&mut self, width: usize) -> Option<u32> {
        assert!(
            matches!(width, 1 | 2 | 4),
            "read_uint width must be 1, 2 or 4, got {}",
            width
        );
        if !self.has_bytes(width) {
            return None;
        }
        Some(self.buffer.get_uint(width) as u32)
    }

    /// Discard `n` bytes. Returns false (and discards nothing) if fewer are buffered.
    pub fn skip(&mut self, n: usize) -> bool {
        if !self.has_bytes(n) {
            return false;
        }
        self.buffer.advance(n);
        true
    }

    /// Drop everything buffered.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}
