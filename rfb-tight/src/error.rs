//! Error types for the Tight decoder.
//!
//! Running out of buffered bytes is not an error; `decode_rect` reports it as
//! `Ok(false)`. Everything here means the byte stream can no longer be framed
//! and the session has to be torn down.

use rfb_common::Rect;
use thiserror::Error;

/// Fatal failures while decoding a Tight rectangle.
#[derive(Debug, Error)]
pub enum TightError {
    /// High nibble of the control byte names no known sub-encoding.
    #[error("Protocol error: unrecognized Tight control byte {0:#04x}")]
    UnknownControl(u8),

    /// The server sent the PNG sub-encoding, which this client never advertises.
    #[error("Protocol error: Tight PNG sub-encoding is not supported")]
    UnsupportedPng,

    /// JPEG sub-encoding received while disabled in [`TightConfig`](crate::TightConfig).
    #[error("Protocol error: Tight JPEG sub-encoding is disabled")]
    JpegDisabled,

    /// Filter id byte other than copy (0), palette (1) or gradient (2).
    #[error("Protocol error: invalid Tight filter id {0}")]
    InvalidFilter(u8),

    /// A palette index points past the end of the palette.
    #[error("Protocol error: palette index {index} out of range (palette size {size})")]
    PaletteIndex { index: usize, size: usize },

    /// The filter cannot be applied to the negotiated pixel format.
    #[error("Protocol error: {0}")]
    FilterFormat(String),

    /// A compact length that is zero or above the configured ceiling.
    #[error("Protocol error: invalid compact length {0}")]
    InvalidCompactLength(usize),

    /// Rectangle wider than the Tight encoder can produce.
    #[error("Protocol error: rectangle too wide ({width} > {max} max)")]
    RectTooWide { width: u32, max: u32 },

    /// The wire pixel format cannot be converted to RGB.
    #[error("Unsupported pixel format: {0}")]
    UnsupportedPixelFormat(String),

    /// Inflate failed or produced a different amount of data than framed.
    #[error("Zlib error on stream {stream_id}: {reason}")]
    Zlib { stream_id: usize, reason: String },

    /// The JPEG capability failed or returned an unusable image.
    #[error("JPEG error: {0}")]
    Jpeg(String),

    /// Called for a new rectangle while another is still in flight.
    #[error("Rectangle {requested:?} requested while {in_flight:?} is still in flight")]
    OutOfOrder { in_flight: Rect, requested: Rect },

    /// The display sink rejected the pixels.
    #[error("Display sink error: {0}")]
    Sink(#[from] anyhow::Error),
}

impl TightError {
    /// True for errors caused by bytes the server sent that violate framing.
    #[must_use]
    pub fn is_protocol_violation(&self) -> bool {
        matches!(
            self,
            Self::UnknownControl(_)
                | Self::UnsupportedPng
                | Self::JpegDisabled
                | Self::InvalidFilter(_)
                | Self::PaletteIndex { .. }
                | Self::FilterFormat(_)
                | Self::InvalidCompactLength(_)
                | Self::RectTooWide { .. }
        )
    }

    /// True for failures of the zlib or JPEG codecs.
    #[must_use]
    pub fn is_codec_failure(&self) -> bool {
        matches!(self, Self::Zlib { .. } | Self::Jpeg(_))
    }

    /// Every decoder error desynchronizes the stream; none can be retried.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        true
    }
}
