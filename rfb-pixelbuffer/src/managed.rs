//! Managed pixel buffer implementation.
//!
//! This module provides [`ManagedPixelBuffer`], a [`DisplaySink`] that owns its
//! pixel data in a `Vec`. Headless callers and tests use it as the framebuffer.
//!
//! # Example
//!
//! ```
//! use rfb_common::Rect;
//! use rfb_pixelbuffer::{DisplaySink, ManagedPixelBuffer, PixelFormat};
//!
//! let mut buffer = ManagedPixelBuffer::new(100, 100, PixelFormat::rgb888());
//! buffer.fill_rect(Rect::new(10, 10, 50, 50), [255, 0, 0]).unwrap();
//!
//! assert_eq!(buffer.dimensions(), (100, 100));
//! assert_eq!(buffer.rgba_at(10, 10), Some([255, 0, 0, 255]));
//! assert_eq!(buffer.rgba_at(9, 10), Some([0, 0, 0, 255]));
//! ```

use crate::{DisplaySink, PixelFormat};
use anyhow::{anyhow, Result};
use rfb_common::Rect;

/// A pixel buffer that manages its own memory.
///
/// # Memory Layout
///
/// Row-major with no padding; the stride equals the width:
///
/// ```text
/// Total size = W * H * B bytes
/// Pixel at (x, y) starts at offset: (y * W + x) * B
/// ```
#[derive(Debug, Clone)]
pub struct ManagedPixelBuffer {
    width: u32,
    height: u32,
    format: PixelFormat,
    /// Raw pixel data (row-major, no padding)
    data: Vec<u8>,
}

impl ManagedPixelBuffer {
    /// Creates a new pixel buffer with the specified dimensions and format.
    ///
    /// The buffer is initialized with all zeros (black for true-color formats).
    pub fn new(width: u32, height: u32, format: PixelFormat) -> Self {
        let bytes_per_pixel = format.bytes_per_pixel() as usize;
        let data = vec![0u8; width as usize * height as usize * bytes_per_pixel];

        Self {
            width,
            height,
            format,
            data,
        }
    }

    /// Returns the dimensions as (width, height).
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Returns a reference to the pixel format.
    pub fn format(&self) -> &PixelFormat {
        &self.format
    }

    /// Returns a reference to the raw pixel data.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// The pixel at (x, y) as RGBA8888, or `None` outside the buffer.
    pub fn rgba_at(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let bpp = self.format.bytes_per_pixel() as usize;
        let offset = (y as usize * self.width as usize + x as usize) * bpp;
        Some(self.format.to_rgb888(&self.data[offset..offset + bpp]))
    }

    /// The whole buffer as RGBA8888 bytes, row-major.
    pub fn to_rgba(&self) -> Vec<u8> {
        let bpp = self.format.bytes_per_pixel() as usize;
        self.data
            .chunks_exact(bpp)
            .flat_map(|pixel| self.format.to_rgb888(pixel))
            .collect()
    }

    /// Validates that a rectangle is within buffer bounds.
    fn validate_rect(&self, rect: Rect) -> Result<()> {
        let inside = Rect::new(0, 0, self.width, self.height).contains(&rect);
        if !inside {
            return Err(anyhow!(
                "Rectangle out of bounds: {:?} (buffer size: {}x{})",
                rect,
                self.width,
                self.height
            ));
        }
        Ok(())
    }

    fn row_offset(&self, rect: Rect, row: usize) -> usize {
        let bpp = self.format.bytes_per_pixel() as usize;
        ((rect.y as usize + row) * self.width as usize + rect.x as usize) * bpp
    }
}

impl DisplaySink for ManagedPixelBuffer {
    fn fill_rect(&mut self, rect: Rect, rgb: [u8; 3]) -> Result<()> {
        self.validate_rect(rect)?;

        let bytes_per_pixel = self.format.bytes_per_pixel() as usize;
        let pixel = self.format.from_rgb888([rgb[0], rgb[1], rgb[2], 255]);

        for y in 0..rect.height as usize {
            let row_offset = self.row_offset(rect, y);
            let row = &mut self.data[row_offset..row_offset + rect.width as usize * bytes_per_pixel];
            for dst in row.chunks_exact_mut(bytes_per_pixel) {
                dst.copy_from_slice(&pixel);
            }
        }

        Ok(())
    }

    fn blit(&mut self, rect: Rect, pixels: &[u8], source: &PixelFormat) -> Result<()> {
        self.validate_rect(rect)?;

        let src_bpp = source.bytes_per_pixel() as usize;
        let dst_bpp = self.format.bytes_per_pixel() as usize;
        let src_row_bytes = rect.width as usize * src_bpp;
        let required = src_row_bytes * rect.height as usize;
        if pixels.len() < required {
            return Err(anyhow!(
                "Insufficient source data: got {} bytes, need {}",
                pixels.len(),
                required
            ));
        }

        let same_format = *source == self.format;
        for y in 0..rect.height as usize {
            let dst_offset = self.row_offset(rect, y);
            let src_row = &pixels[y * src_row_bytes..(y + 1) * src_row_bytes];
            let dst_row = &mut self.data[dst_offset..dst_offset + rect.width as usize * dst_bpp];

            if same_format {
                dst_row.copy_from_slice(src_row);
                continue;
            }
            for (src, dst) in src_row
                .chunks_exact(src_bpp)
                .zip(dst_row.chunks_exact_mut(dst_bpp))
            {
                self.format.write_rgb888(source.to_rgb888(src), dst);
            }
        }

        Ok(())
    }
}
