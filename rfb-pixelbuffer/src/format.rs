//! RFB pixel format descriptions and conversions.
//!
//! This module defines the [`PixelFormat`] type which describes how pixels are encoded
//! on the wire and in pixel buffers. It handles various color depths, endianness, and
//! channel layouts.
//!
//! # Pixel Format Components
//!
//! - **bits_per_pixel**: Storage size in bits (8, 16, 24 or 32)
//! - **depth**: Actual color depth (sum of significant bits in R, G, B channels)
//! - **big_endian**: Byte order for multi-byte pixels
//! - **red/green/blue_max**: Maximum value for each color channel (e.g., 255 for 8-bit)
//! - **red/green/blue_shift**: Bit position of the least significant bit of each channel
//!
//! # Channel Extraction and Scaling
//!
//! To extract a color component from a pixel value:
//! 1. Shift right by the channel's shift value
//! 2. Mask with the channel's max value
//! 3. Scale to 8-bit: `(component * 255) / channel_max`
//!
//! # Example
//!
//! ```
//! use rfb_pixelbuffer::PixelFormat;
//!
//! let pf = PixelFormat::rgb888();
//! assert_eq!(pf.bytes_per_pixel(), 4);
//!
//! // Little-endian 0x00AABBCC
//! let pixel = [0xCC, 0xBB, 0xAA, 0x00];
//! assert_eq!(pf.to_rgb888(&pixel), [0xAA, 0xBB, 0xCC, 0xFF]);
//! assert_eq!(pf.from_rgb888([0xAA, 0xBB, 0xCC, 0xFF]), vec![0xCC, 0xBB, 0xAA, 0x00]);
//!
//! // Packed 3-byte R,G,B
//! let rgb = PixelFormat::rgb24();
//! assert_eq!(rgb.to_rgb888(&[0xFF, 0x88, 0x44]), [0xFF, 0x88, 0x44, 0xFF]);
//! ```

use anyhow::{bail, Result};

/// Describes an RFB pixel format and provides conversions to/from RGB888.
#[derive(Debug, Clone, PartialEq, Eq, Copy)]
pub struct PixelFormat {
    /// Bits used per pixel (bpp), e.g., 32 for RGB888 in 32-bit storage.
    pub bits_per_pixel: u8,

    /// Actual color depth (sum of significant bits), e.g., 24 for RGB888.
    pub depth: u8,

    /// Byte order for multi-byte pixels (`true` = big endian).
    pub big_endian: bool,

    /// True color (direct color) vs. color map (`false`).
    pub true_color: bool,

    /// Maximum valid red component value in this format (e.g., 255 for 8-bit red).
    pub red_max: u16,

    /// Maximum valid green component value in this format.
    pub green_max: u16,

    /// Maximum valid blue component value in this format.
    pub blue_max: u16,

    /// Bit shift for the least significant bit of the red component.
    pub red_shift: u8,

    /// Bit shift for the least significant bit of the green component.
    pub green_shift: u8,

    /// Bit shift for the least significant bit of the blue component.
    pub blue_shift: u8,
}

impl PixelFormat {
    /// Returns bytes-per-pixel (storage width), rounded up to the nearest byte.
    pub fn bytes_per_pixel(&self) -> u8 {
        self.bits_per_pixel.div_ceil(8)
    }

    /// Returns a standard little-endian 32bpp RGB888 pixel format.
    ///
    /// In memory, a pixel with R=0xAA, G=0xBB, B=0xCC is stored as
    /// `[0xCC, 0xBB, 0xAA, 0x00]`.
    pub fn rgb888() -> Self {
        Self {
            bits_per_pixel: 32,
            depth: 24,
            big_endian: false,
            true_color: true,
            red_max: 255,
            green_max: 255,
            blue_max: 255,
            red_shift: 16,
            green_shift: 8,
            blue_shift: 0,
        }
    }

    /// Returns the packed 24bpp format whose bytes are R, G, B in that order.
    ///
    /// This is the layout of Tight's compact pixels and of decoded JPEG output.
    pub fn rgb24() -> Self {
        Self {
            bits_per_pixel: 24,
            depth: 24,
            big_endian: true,
            true_color: true,
            red_max: 255,
            green_max: 255,
            blue_max: 255,
            red_shift: 16,
            green_shift: 8,
            blue_shift: 0,
        }
    }

    /// Check that the format can be converted to and from RGB.
    pub fn validate(&self) -> Result<()> {
        if !matches!(self.bits_per_pixel, 8 | 16 | 24 | 32) {
            bail!("unsupported bits_per_pixel {}", self.bits_per_pixel);
        }
        if !self.true_color {
            bail!("color-map pixel formats are not supported");
        }
        if self.red_max == 0 || self.green_max == 0 || self.blue_max == 0 {
            bail!(
                "channel max must be > 0 (r={}, g={}, b={})",
                self.red_max,
                self.green_max,
                self.blue_max
            );
        }
        for ((name, max), shift) in ["red", "green", "blue"]
            .into_iter()
            .zip(self.channel_maxes())
            .zip(self.channel_shifts())
        {
            if shift >= self.bits_per_pixel || (max as u64) << shift >= 1u64 << self.bits_per_pixel {
                bail!(
                    "{} channel (max {}, shift {}) does not fit in {} bits per pixel",
                    name,
                    max,
                    shift,
                    self.bits_per_pixel
                );
            }
        }
        Ok(())
    }

    /// Channel maxima in R, G, B order.
    pub fn channel_maxes(&self) -> [u16; 3] {
        [self.red_max, self.green_max, self.blue_max]
    }

    /// Channel shifts in R, G, B order.
    pub fn channel_shifts(&self) -> [u8; 3] {
        [self.red_shift, self.green_shift, self.blue_shift]
    }

    /// Assemble a pixel's bytes into its integer value according to endianness.
    pub fn pixel_value(&self, pixel: &[u8]) -> u32 {
        let bpp = self.bytes_per_pixel() as usize;
        let mut value = 0u32;
        if self.big_endian {
            for &byte in pixel.iter().take(bpp) {
                value = (value << 8) | (byte as u32);
            }
        } else {
            for (i, &byte) in pixel.iter().take(bpp).enumerate() {
                value |= (byte as u32) << (i * 8);
            }
        }
        value
    }

    /// Write an integer pixel value into `out` according to endianness.
    pub fn write_pixel_value(&self, mut value: u32, out: &mut [u8]) {
        let bpp = self.bytes_per_pixel() as usize;
        if self.big_endian {
            for i in 0..bpp {
                out[bpp - 1 - i] = (value & 0xFF) as u8;
                value >>= 8;
            }
        } else {
            for item in out.iter_mut().take(bpp) {
                *item = (value & 0xFF) as u8;
                value >>= 8;
            }
        }
    }

    /// Converts a pixel from this format to RGBA8888 `[R, G, B, A]` where `A=255`.
    ///
    /// # Panics
    ///
    /// Panics if `pixel.len()` does not equal `self.bytes_per_pixel()`, or if any
    /// color channel max value is zero (invalid format).
    pub fn to_rgb888(&self, pixel: &[u8]) -> [u8; 4] {
        let bpp = self.bytes_per_pixel() as usize;
        assert_eq!(
            pixel.len(),
            bpp,
            "pixel length {} does not match bytes_per_pixel {}",
            pixel.len(),
            bpp
        );
        assert!(self.red_max > 0, "red_max must be > 0");
        assert!(self.green_max > 0, "green_max must be > 0");
        assert!(self.blue_max > 0, "blue_max must be > 0");

        let value = self.pixel_value(pixel);

        let r = (value >> self.red_shift) & (self.red_max as u32);
        let g = (value >> self.green_shift) & (self.green_max as u32);
        let b = (value >> self.blue_shift) & (self.blue_max as u32);

        let r8 = ((r * 255) / self.red_max as u32) as u8;
        let g8 = ((g * 255) / self.green_max as u32) as u8;
        let b8 = ((b * 255) / self.blue_max as u32) as u8;

        [r8, g8, b8, 255]
    }

    /// Converts an RGBA8888 pixel `[R, G, B, A]` to this format.
    ///
    /// The alpha channel is ignored (only RGB channels are encoded).
    pub fn from_rgb888(&self, rgb: [u8; 4]) -> Vec<u8> {
        let mut result = vec![0u8; self.bytes_per_pixel() as usize];
        self.write_rgb888(rgb, &mut result);
        result
    }

    /// Like [`from_rgb888`](Self::from_rgb888) but writes into an existing slice
    /// of at least `bytes_per_pixel()` bytes.
    pub fn write_rgb888(&self, rgb: [u8; 4], out: &mut [u8]) {
        let r = (rgb[0] as u32 * self.red_max as u32) / 255;
        let g = (rgb[1] as u32 * self.green_max as u32) / 255;
        let b = (rgb[2] as u32 * self.blue_max as u32) / 255;

        let value = (r << self.red_shift) | (g << self.green_shift) | (b << self.blue_shift);
        self.write_pixel_value(value, out);
    }

    /// Check if this pixel format is RGB888 (32bpp, 24-bit depth, little-endian).
    pub fn is_rgb888(&self) -> bool {
        *self == Self::rgb888()
    }
}
