//! The display sink contract.
//!
//! Decoders never present anything themselves. They hand finished pixels to a
//! [`DisplaySink`], which owns the framebuffer and converts from the decoder's
//! source format into whatever it stores. Flushing to the screen is the caller's
//! business and is deliberately absent from the trait.
//!
//! # Example
//!
//! ```
//! use rfb_common::Rect;
//! use rfb_pixelbuffer::{DisplaySink, ManagedPixelBuffer, PixelFormat};
//!
//! let mut fb = ManagedPixelBuffer::new(4, 4, PixelFormat::rgb888());
//! fb.fill_rect(Rect::new(0, 0, 4, 4), [0xFF, 0x88, 0x44]).unwrap();
//!
//! // Two packed R,G,B pixels
//! let pixels = [0x00, 0x00, 0xFF, 0x00, 0xFF, 0x00];
//! fb.blit(Rect::new(2, 3, 2, 1), &pixels, &PixelFormat::rgb24()).unwrap();
//!
//! assert_eq!(fb.rgba_at(0, 0), Some([0xFF, 0x88, 0x44, 0xFF]));
//! assert_eq!(fb.rgba_at(3, 3), Some([0x00, 0xFF, 0x00, 0xFF]));
//! ```

use crate::PixelFormat;
use anyhow::Result;
use rfb_common::Rect;

/// Destination for decoded rectangles.
pub trait DisplaySink {
    /// Fill `rect` with a single color given as R, G, B.
    ///
    /// Returns an error if the rectangle lies outside the sink.
    fn fill_rect(&mut self, rect: Rect, rgb: [u8; 3]) -> Result<()>;

    /// Copy a tightly packed block of `rect.width * rect.height` pixels into
    /// `rect`, converting from `source` to the sink's own format.
    ///
    /// Returns an error if the rectangle lies outside the sink or `pixels` is
    /// too short for the rectangle.
    fn blit(&mut self, rect: Rect, pixels: &[u8], source: &PixelFormat) -> Result<()>;
}

impl<S: DisplaySink + ?Sized> DisplaySink for &mut S {
    fn fill_rect(&mut self, rect: Rect, rgb: [u8; 3]) -> Result<()> {
        (**self).fill_rect(rect, rgb)
    }

    fn blit(&mut self, rect: Rect, pixels: &[u8], source: &PixelFormat) -> Result<()> {
        (**self).blit(rect, pixels, source)
    }
}
