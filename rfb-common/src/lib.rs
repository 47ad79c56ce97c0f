//! Common types shared by the RFB crates.
//!
//! - [`Rect`] - a framebuffer region as carried in a rectangle header

/// A rectangle defined by top-left position and dimensions.
///
/// Rectangle headers on the wire carry `u16` fields; they are widened here so
/// edge arithmetic never overflows. A zero width or height is legal and
/// describes an empty region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    /// Create a new rectangle.
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Build a rectangle from the `u16` fields of a rectangle header.
    pub const fn from_header(x: u16, y: u16, width: u16, height: u16) -> Self {
        Self::new(x as i32, y as i32, width as u32, height as u32)
    }

    /// Get the right edge (x + width).
    pub const fn right(&self) -> i32 {
        self.x + self.width as i32
    }

    /// Get the bottom edge (y + height).
    pub const fn bottom(&self) -> i32 {
        self.y + self.height as i32
    }

    /// True when the rectangle covers no pixels.
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Number of pixels covered, as a buffer length multiplier.
    pub const fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// True when `other` lies entirely inside this rectangle.
    pub const fn contains(&self, other: &Rect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }
}
