//! Basic-rectangle filters and the Tight wire pixel.
//!
//! A basic rectangle carries `payload_len` bytes once inflated. Every filter
//! turns those bytes into a tightly packed block of pixels in the
//! [`WirePixel`] format, ready for [`DisplaySink::blit`](rfb_pixelbuffer::DisplaySink::blit).

use crate::TightError;
use rfb_common::Rect;
use rfb_pixelbuffer::PixelFormat;

/// Filter id: pixels sent as-is.
pub const FILTER_COPY: u8 = 0x00;
/// Filter id: palette followed by indices.
pub const FILTER_PALETTE: u8 = 0x01;
/// Filter id: per-channel prediction deltas.
pub const FILTER_GRADIENT: u8 = 0x02;

/// Palettes of at most this many colors send 1-bit indices.
pub const MONO_PALETTE_MAX: usize = 2;

/// How one pixel is laid out in Tight data.
///
/// Tight drops the padding byte of 32bpp depth-24 formats with 8-bit
/// channels and sends R, G, B instead ("TPIXEL"). Every other format is sent
/// in its native bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WirePixel {
    /// Format of the bytes as they appear in Tight data.
    pub format: PixelFormat,
    /// Bytes per pixel in Tight data.
    pub size: usize,
}

impl WirePixel {
    pub fn for_format(wire: &PixelFormat) -> Self {
        let compact = wire.true_color
            && wire.bits_per_pixel == 32
            && wire.depth == 24
            && wire.channel_maxes() == [255, 255, 255];
        let format = if compact { PixelFormat::rgb24() } else { *wire };
        Self {
            format,
            size: format.bytes_per_pixel() as usize,
        }
    }

    /// Convert one pixel of Tight data to R, G, B.
    pub fn to_rgb(&self, pixel: &[u8]) -> [u8; 3] {
        let [r, g, b, _] = self.format.to_rgb888(pixel);
        [r, g, b]
    }
}

/// Colors of a palette-filtered rectangle, in wire pixel bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    count: usize,
    pixel_size: usize,
    colors: Vec<u8>,
}

impl Palette {
    /// An empty palette that will hold `count` colors of `pixel_size` bytes.
    pub fn with_capacity(count: usize, pixel_size: usize) -> Self {
        Self {
            count,
            pixel_size,
            colors: Vec::with_capacity(count * pixel_size),
        }
    }

    /// Declared number of colors.
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Colors still to be read.
    pub fn missing(&self) -> usize {
        self.count - self.colors.len() / self.pixel_size
    }

    pub fn is_complete(&self) -> bool {
        self.missing() == 0
    }

    /// Append whole colors.
    pub fn extend(&mut self, bytes: &[u8]) {
        debug_assert_eq!(bytes.len() % self.pixel_size, 0);
        self.colors.extend_from_slice(bytes);
    }

    /// True when indices are packed 1 bit per pixel.
    pub fn is_mono(&self) -> bool {
        self.count <= MONO_PALETTE_MAX
    }

    fn color(&self, index: usize) -> Result<&[u8], TightError> {
        if index >= self.count {
            return Err(TightError::PaletteIndex {
                index,
                size: self.count,
            });
        }
        let start = index * self.pixel_size;
        Ok(&self.colors[start..start + self.pixel_size])
    }
}

/// Interpretation of a basic rectangle's payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    Copy,
    Palette(Palette),
    Gradient,
}

impl Filter {
    pub fn name(&self) -> &'static str {
        match self {
            Filter::Copy => "copy",
            Filter::Palette(_) => "palette",
            Filter::Gradient => "gradient",
        }
    }

    /// Reject filters the wire format cannot carry.
    pub fn check_format(&self, pixel: &WirePixel) -> Result<(), TightError> {
        if matches!(self, Filter::Gradient) && pixel.format.bits_per_pixel == 8 {
            return Err(TightError::FilterFormat(
                "gradient filter requires 16, 24 or 32 bpp".to_string(),
            ));
        }
        Ok(())
    }

    /// Uncompressed payload size for `rect`.
    pub fn payload_len(&self, rect: &Rect, pixel: &WirePixel) -> usize {
        match self {
            Filter::Copy | Filter::Gradient => rect.pixel_count() * pixel.size,
            Filter::Palette(palette) if palette.is_mono() => {
                (rect.width as usize).div_ceil(8) * rect.height as usize
            }
            Filter::Palette(_) => rect.pixel_count(),
        }
    }

    /// Turn a complete payload into packed pixels in `pixel.format`.
    pub fn apply(&self, data: &[u8], rect: &Rect, pixel: &WirePixel) -> Result<Vec<u8>, TightError> {
        debug_assert_eq!(data.len(), self.payload_len(rect, pixel));
        if rect.is_empty() {
            return Ok(Vec::new());
        }
        match self {
            Filter::Copy => Ok(data.to_vec()),
            Filter::Palette(palette) => expand_palette(palette, data, rect, pixel),
            Filter::Gradient => Ok(undo_gradient(data, rect, pixel)),
        }
    }
}

fn expand_palette(
    palette: &Palette,
    data: &[u8],
    rect: &Rect,
    pixel: &WirePixel,
) -> Result<Vec<u8>, TightError> {
    let width = rect.width as usize;
    let mut pixels = Vec::with_capacity(rect.pixel_count() * pixel.size);

    if palette.is_mono() {
        let row_bytes = width.div_ceil(8);
        for row in data.chunks_exact(row_bytes) {
            for x in 0..width {
                let index = (row[x / 8] >> (7 - x % 8)) & 1;
                pixels.extend_from_slice(palette.color(index as usize)?);
            }
        }
    } else {
        for &index in data {
            pixels.extend_from_slice(palette.color(index as usize)?);
        }
    }

    Ok(pixels)
}

/// Median edge predictor for one channel.
fn predict(left: u32, above: u32, above_left: u32) -> u32 {
    let (low, high) = if left < above { (left, above) } else { (above, left) };
    if above_left >= high {
        low
    } else if above_left <= low {
        high
    } else {
        left + above - above_left
    }
}

fn undo_gradient(data: &[u8], rect: &Rect, pixel: &WirePixel) -> Vec<u8> {
    let format = &pixel.format;
    let shifts = format.channel_shifts();
    let maxes = format.channel_maxes().map(u32::from);
    let width = rect.width as usize;

    let mut pixels = vec![0u8; data.len()];
    let mut above = vec![[0u32; 3]; width];
    let mut current = vec![[0u32; 3]; width];

    for (y, (src_row, dst_row)) in data
        .chunks_exact(width * pixel.size)
        .zip(pixels.chunks_exact_mut(width * pixel.size))
        .enumerate()
    {
        for x in 0..width {
            let src = &src_row[x * pixel.size..(x + 1) * pixel.size];
            let delta = format.pixel_value(src);
            let mut value = 0u32;

            for c in 0..3 {
                let predicted = match (x, y) {
                    (0, 0) => 0,
                    (_, 0) => current[x - 1][c],
                    (0, _) => above[x][c],
                    _ => predict(current[x - 1][c], above[x][c], above[x - 1][c]),
                };
                let d = (delta >> shifts[c]) & maxes[c];
                let channel = (predicted + d) % (maxes[c] + 1);
                current[x][c] = channel;
                value |= channel << shifts[c];
            }

            format.write_pixel_value(value, &mut dst_row[x * pixel.size..(x + 1) * pixel.size]);
        }
        std::mem::swap(&mut above, &mut current);
    }

    pixels
}
