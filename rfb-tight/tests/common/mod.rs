//! Shared helpers for the Tight integration tests.

#![allow(dead_code)]

use rfb_tight::{
    DisplaySink, ManagedPixelBuffer, PixelFormat, Rect, RectDecoder, RfbInQueue, TightDecoder,
    TightError,
};

pub const BLUE: [u8; 3] = [0x00, 0x00, 0xFF];
pub const GREEN: [u8; 3] = [0x00, 0xFF, 0x00];

/// A display in the client's usual 32bpp format.
pub fn display(width: u32, height: u32) -> ManagedPixelBuffer {
    ManagedPixelBuffer::new(width, height, PixelFormat::rgb888())
}

/// Depth 24 true colour, as negotiated by most clients.
pub fn wire_format() -> PixelFormat {
    PixelFormat::rgb888()
}

/// RGBA bytes of a checkerboard made of 2x2 blocks, blue in the top-left.
pub fn checkerboard(width: u32, height: u32) -> Vec<u8> {
    let mut out = Vec::with_capacity((width * height * 4) as usize);
    for y in 0..height {
        for x in 0..width {
            let color = if (x / 2 + y / 2) % 2 == 0 { BLUE } else { GREEN };
            out.extend_from_slice(&[color[0], color[1], color[2], 0xFF]);
        }
    }
    out
}

/// Paint the 4x4 checkerboard with fills, for tests that expect no change.
pub fn paint_checkerboard(fb: &mut ManagedPixelBuffer) {
    fb.fill_rect(Rect::new(0, 0, 4, 4), BLUE).unwrap();
    fb.fill_rect(Rect::new(2, 0, 2, 2), GREEN).unwrap();
    fb.fill_rect(Rect::new(0, 2, 2, 2), GREEN).unwrap();
}

/// Decode one rectangle with all of its bytes already buffered.
pub fn decode_whole(
    decoder: &mut TightDecoder,
    rect: Rect,
    bytes: &[u8],
    fb: &mut ManagedPixelBuffer,
) -> Result<bool, TightError> {
    let mut queue = RfbInQueue::new();
    queue.push(bytes);
    let done = decoder.decode_rect(&rect, &mut queue, fb, &wire_format())?;
    assert_eq!(queue.available(), 0, "rectangle left bytes unconsumed");
    Ok(done)
}

/// Decode one rectangle feeding the given chunks one at a time.
///
/// Asserts that the decoder only reports completion after the last chunk.
pub fn decode_chunked(
    decoder: &mut TightDecoder,
    rect: Rect,
    chunks: &[&[u8]],
    fb: &mut ManagedPixelBuffer,
) -> Result<bool, TightError> {
    let mut queue = RfbInQueue::new();
    let mut done = false;
    for (i, chunk) in chunks.iter().enumerate() {
        queue.push(chunk);
        done = decoder.decode_rect(&rect, &mut queue, fb, &wire_format())?;
        if i + 1 < chunks.len() {
            assert!(!done, "completed before chunk {} of {}", i + 2, chunks.len());
        }
    }
    assert_eq!(queue.available(), 0, "rectangle left bytes unconsumed");
    Ok(done)
}

/// Split `bytes` at the given (sorted, deduplicated) offsets.
pub fn split_at_points<'a>(bytes: &'a [u8], points: &[usize]) -> Vec<&'a [u8]> {
    let mut chunks = Vec::with_capacity(points.len() + 1);
    let mut start = 0;
    for &point in points {
        chunks.push(&bytes[start..point]);
        start = point;
    }
    chunks.push(&bytes[start..]);
    chunks
}

/// One rectangle of a reference update.
pub struct Vector {
    pub name: &'static str,
    pub display: (u32, u32),
    pub rects: Vec<(Rect, Vec<u8>)>,
}

pub const BLUE_COPY: [u8; 7] = [0x00, 0x00, 0x00, 0xFF, 0x00, 0x00, 0xFF];
pub const GREEN_COPY: [u8; 7] = [0x00, 0x00, 0xFF, 0x00, 0x00, 0xFF, 0x00];
pub const BLUE_GRADIENT: [u8; 8] = [0x40, 0x02, 0x00, 0x00, 0xFF, 0x00, 0x00, 0x00];
pub const GREEN_GRADIENT: [u8; 8] = [0x40, 0x02, 0x00, 0xFF, 0x00, 0x00, 0x00, 0x00];

/// Eight 2x1 rectangles that tile the 4x4 checkerboard.
fn tiled(blue: &[u8], green: &[u8]) -> Vec<(Rect, Vec<u8>)> {
    [
        (0, 0, blue),
        (0, 1, blue),
        (2, 0, green),
        (2, 1, green),
        (0, 2, green),
        (0, 3, green),
        (2, 2, blue),
        (2, 3, blue),
    ]
    .into_iter()
    .map(|(x, y, bytes)| (Rect::new(x, y, 2, 1), bytes.to_vec()))
    .collect()
}

/// Reference updates that each draw the checkerboard.
pub fn checkerboard_vectors() -> Vec<Vector> {
    vec![
        Vector {
            name: "uncompressed copy",
            display: (4, 4),
            rects: tiled(&BLUE_COPY, &GREEN_COPY),
        },
        Vector {
            name: "compressed copy",
            display: (4, 4),
            rects: vec![(
                Rect::new(0, 0, 4, 4),
                vec![
                    0x00, 0x15, 0x78, 0x9C, 0x63, 0x60, 0xF8, 0xCF, 0x00, 0x44, 0x60, 0x82, 0x01,
                    0x99, 0x8D, 0x29, 0x02, 0xA6, 0x00, 0x7E, 0xBF, 0x0F, 0xF1,
                ],
            )],
        },
        Vector {
            name: "uncompressed mono",
            display: (4, 4),
            rects: vec![(
                Rect::new(0, 0, 4, 4),
                vec![
                    0x40, 0x01, 0x01, 0x00, 0x00, 0xFF, 0x00, 0xFF, 0x00, 0x30, 0x30, 0xC0, 0xC0,
                ],
            )],
        },
        Vector {
            name: "compressed mono",
            display: (4, 12),
            rects: vec![(
                Rect::new(0, 0, 4, 12),
                vec![
                    0x40, 0x01, 0x01, 0x00, 0x00, 0xFF, 0x00, 0xFF, 0x00, 0x0E, 0x78, 0x9C, 0x33,
                    0x30, 0x38, 0x70, 0xC0, 0x00, 0x8A, 0x01, 0x21, 0x3C, 0x05, 0xA1,
                ],
            )],
        },
        Vector {
            name: "uncompressed palette",
            display: (4, 4),
            rects: vec![
                (
                    Rect::new(0, 0, 4, 2),
                    vec![
                        0x40, 0x01, 0x02, 0x00, 0x00, 0xFF, 0x00, 0xFF, 0x00, 0x00, 0x00, 0x00,
                        0x00, 0x00, 0x01, 0x01, 0x00, 0x00, 0x01, 0x01,
                    ],
                ),
                (
                    Rect::new(0, 2, 4, 2),
                    vec![
                        0x40, 0x01, 0x02, 0x00, 0x00, 0xFF, 0x00, 0xFF, 0x00, 0x00, 0x00, 0x00,
                        0x01, 0x01, 0x00, 0x00, 0x01, 0x01, 0x00, 0x00,
                    ],
                ),
            ],
        },
        Vector {
            name: "compressed palette",
            display: (4, 4),
            rects: vec![(
                Rect::new(0, 0, 4, 4),
                vec![
                    0x40, 0x01, 0x02, 0x00, 0x00, 0xFF, 0x00, 0xFF, 0x00, 0x00, 0x00, 0x00, 0x12,
                    0x78, 0x9C, 0x63, 0x60, 0x60, 0x64, 0x64, 0x00, 0x62, 0x08, 0xC9, 0xC0, 0x00,
                    0x00, 0x00, 0x54, 0x00, 0x09,
                ],
            )],
        },
        Vector {
            name: "uncompressed gradient",
            display: (4, 4),
            rects: tiled(&BLUE_GRADIENT, &GREEN_GRADIENT),
        },
        Vector {
            name: "compressed gradient",
            display: (4, 4),
            rects: vec![(
                Rect::new(0, 0, 4, 4),
                vec![
                    0x40, 0x02, 0x18, 0x78, 0x9C, 0x62, 0x60, 0xF8, 0xCF, 0x00, 0x04, 0xFF, 0x19,
                    0x19, 0xD0, 0x00, 0x44, 0x84, 0xF1, 0x3F, 0x9A, 0x30, 0x00, 0x00, 0x00, 0xFF,
                    0xFF,
                ],
            )],
        },
    ]
}
