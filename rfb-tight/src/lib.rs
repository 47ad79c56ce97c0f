//! Client-side decoder for the RFB "Tight" rectangle encoding.
//!
//! A decoder reads one framebuffer update rectangle from a non-blocking
//! [`RfbInQueue`] and writes the decoded pixels to a [`DisplaySink`]. Because
//! the queue only holds what the transport has delivered so far, decoding is
//! resumable: [`RectDecoder::decode_rect`] returns `Ok(false)` when it needs
//! more bytes and is called again, with the same rectangle, once they arrive.
//!
//! # Key Concepts
//!
//! - **Incomplete is not an error**: `Ok(false)` means "call again later"
//! - **Fail-fast policy**: every [`TightError`] desynchronizes the stream and
//!   ends the session; there are no fallbacks
//! - **Session state**: the four zlib streams live as long as the decoder
//! - **In-order application**: a JPEG rectangle holds the decoder until its
//!   image is decoded, so later rectangles cannot overtake it
//!
//! # Example
//!
//! ```
//! use rfb_tight::{ManagedPixelBuffer, PixelFormat, Rect, RectDecoder, RfbInQueue, TightDecoder};
//!
//! let mut decoder = TightDecoder::default();
//! let mut fb = ManagedPixelBuffer::new(4, 4, PixelFormat::rgb888());
//! let mut queue = RfbInQueue::new();
//!
//! // Basic rectangle, explicit copy filter, two literal R,G,B pixels
//! queue.push(&[0x40, 0x00, 0x00, 0x00, 0xFF, 0x00, 0xFF, 0x00]);
//! let done = decoder
//!     .decode_rect(&Rect::new(0, 0, 2, 1), &mut queue, &mut fb, &PixelFormat::rgb888())
//!     .unwrap();
//!
//! assert!(done);
//! assert_eq!(fb.rgba_at(0, 0), Some([0x00, 0x00, 0xFF, 0xFF]));
//! assert_eq!(fb.rgba_at(1, 0), Some([0x00, 0xFF, 0x00, 0xFF]));
//! ```

pub use rfb_common::Rect;
pub use rfb_pixelbuffer::{DisplaySink, ManagedPixelBuffer, PixelFormat};
pub use rfb_protocol::RfbInQueue;

pub mod compact;
pub use compact::{encode_compact_length, parse_compact_length, read_compact_length};

pub mod config;
pub use config::TightConfig;

pub mod error;
pub use error::TightError;

pub mod filter;
pub use filter::{Filter, Palette, WirePixel};

pub mod jpeg;
pub use jpeg::{DecodedImage, ImageSender, JpegCodec, PendingImage, ThreadedJpegCodec};

pub mod tight;
pub use tight::{TightDecoder, TIGHT_MIN_TO_COMPRESS};

pub mod zlib;
pub use zlib::ZlibStreamPool;

/// RFB encoding number of Tight.
pub const ENCODING_TIGHT: i32 = 7;

/// A decoder for one rectangle encoding.
///
/// Implementations keep whatever state must survive between rectangles (zlib
/// streams, a half-parsed rectangle) and are driven by the connection layer
/// each time new bytes land in the queue.
pub trait RectDecoder {
    /// The RFB encoding number this decoder handles.
    fn encoding_type(&self) -> i32;

    /// Decode as much of `rect` as the queue allows.
    ///
    /// Returns `Ok(true)` once the rectangle has been written to `sink`, and
    /// `Ok(false)` when it needs more input; the caller must then repeat the
    /// call with the same rectangle. `pixel_format` is the negotiated wire
    /// format.
    fn decode_rect(
        &mut self,
        rect: &Rect,
        queue: &mut RfbInQueue,
        sink: &mut dyn DisplaySink,
        pixel_format: &PixelFormat,
    ) -> Result<bool, TightError>;
}
