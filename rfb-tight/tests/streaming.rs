//! Chunk-boundary independence and zlib stream continuity.

mod common;

use common::*;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use rfb_tight::{encode_compact_length, Rect, RectDecoder, RfbInQueue, TightDecoder};
use std::io::Write;
use tokio::io::AsyncWriteExt;

/// Compress payloads through one deflate context, one sync-flushed blob each.
fn continuing_blobs(payloads: &[&[u8]]) -> Vec<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    let mut blobs = Vec::new();
    let mut start = 0;
    for payload in payloads {
        encoder.write_all(payload).unwrap();
        encoder.flush().unwrap();
        let all = encoder.get_ref();
        blobs.push(all[start..].to_vec());
        start = all.len();
    }
    blobs
}

fn basic_rect(control: u8, blob: &[u8]) -> Vec<u8> {
    let mut bytes = vec![control];
    bytes.extend(encode_compact_length(blob.len()));
    bytes.extend_from_slice(blob);
    bytes
}

fn rgba(pixels: &[u8]) -> Vec<u8> {
    pixels
        .chunks_exact(3)
        .flat_map(|p| [p[0], p[1], p[2], 0xFF])
        .collect()
}

fn render_vector(vector: &Vector, split: impl Fn(&[u8]) -> Vec<usize>) -> Vec<u8> {
    let mut decoder = TightDecoder::default();
    let (width, height) = vector.display;
    let mut fb = display(width, height);
    for (rect, bytes) in &vector.rects {
        let points = split(bytes);
        let chunks = split_at_points(bytes, &points);
        let done = decode_chunked(&mut decoder, *rect, &chunks, &mut fb)
            .unwrap_or_else(|e| panic!("{}: {}", vector.name, e));
        assert!(done, "{}: rectangle {:?} incomplete", vector.name, rect);
    }
    fb.to_rgba()
}

/// R,G,B pixels of a `size` x `size` image made of horizontal stripes.
fn striped(size: u32) -> Vec<u8> {
    (0..size * size)
        .flat_map(|i| {
            let band = ((i / size) / 8) as u8;
            [band.wrapping_mul(40), 0x80, 0xFF - band]
        })
        .collect()
}

/// A copy rectangle on stream 0, compressed in one sync-flushed blob.
fn large_copy(pixels: &[u8]) -> Vec<u8> {
    basic_rect(0x00, &continuing_blobs(&[pixels])[0])
}

fn render_large(size: u32, chunks: &[&[u8]]) -> Vec<u8> {
    let mut decoder = TightDecoder::default();
    let mut fb = display(size, size);
    let rect = Rect::new(0, 0, size, size);
    assert!(decode_chunked(&mut decoder, rect, chunks, &mut fb).unwrap());
    fb.to_rgba()
}

#[test]
fn test_byte_at_a_time_matches_whole() {
    for vector in checkerboard_vectors() {
        let (width, height) = vector.display;
        let pixels = render_vector(&vector, |bytes| (1..bytes.len()).collect());
        assert_eq!(pixels, checkerboard(width, height), "{}", vector.name);
    }
}

#[test]
fn test_fill_byte_at_a_time() {
    let mut decoder = TightDecoder::default();
    let mut fb = display(4, 4);
    let bytes = [0x80, 0xFF, 0x88, 0x44];
    let chunks: Vec<&[u8]> = bytes.chunks(1).collect();
    assert!(decode_chunked(&mut decoder, Rect::new(0, 0, 4, 4), &chunks, &mut fb).unwrap());
    assert_eq!(fb.rgba_at(0, 3), Some([0xFF, 0x88, 0x44, 0xFF]));
}

#[test]
fn test_incomplete_call_changes_nothing() {
    let mut decoder = TightDecoder::default();
    let mut fb = display(4, 4);
    paint_checkerboard(&mut fb);
    let mut queue = RfbInQueue::new();
    let rect = Rect::new(0, 0, 4, 4);

    // Compact length 0x80 0x01 split after its first byte.
    queue.push(&[0x40, 0x02, 0x80]);
    assert!(!decoder.decode_rect(&rect, &mut queue, &mut fb, &wire_format()).unwrap());
    assert_eq!(queue.available(), 1);
    assert!(!decoder.decode_rect(&rect, &mut queue, &mut fb, &wire_format()).unwrap());
    assert_eq!(queue.available(), 1);
    assert_eq!(fb.to_rgba(), checkerboard(4, 4));
    assert_eq!(decoder.in_flight(), Some(rect));
}

#[test]
fn test_history_continues_across_rects() {
    let first = [10u8, 20, 30].repeat(4);
    let second = [10u8, 20, 30, 40, 50, 60].repeat(2);
    let blobs = continuing_blobs(&[&first[..], &second[..]]);

    let mut decoder = TightDecoder::default();
    let mut fb = display(4, 1);
    let rect = Rect::new(0, 0, 4, 1);

    assert!(decode_whole(&mut decoder, rect, &basic_rect(0x00, &blobs[0]), &mut fb).unwrap());
    assert_eq!(fb.to_rgba(), rgba(&first));

    assert!(decode_whole(&mut decoder, rect, &basic_rect(0x00, &blobs[1]), &mut fb).unwrap());
    assert_eq!(fb.to_rgba(), rgba(&second));
}

#[test]
fn test_reset_bit_discards_history() {
    let first = [10u8, 20, 30].repeat(4);
    let second = [10u8, 20, 30, 40, 50, 60].repeat(2);
    let blobs = continuing_blobs(&[&first[..], &second[..]]);

    let mut decoder = TightDecoder::default();
    let mut fb = display(4, 1);
    let rect = Rect::new(0, 0, 4, 1);
    assert!(decode_whole(&mut decoder, rect, &basic_rect(0x00, &blobs[0]), &mut fb).unwrap());

    // The continuation only makes sense with the old window.
    let result = decode_whole(&mut decoder, rect, &basic_rect(0x01, &blobs[1]), &mut fb);
    assert!(result.unwrap_err().is_codec_failure());
}

#[test]
fn test_fresh_stream_needs_reset_bit() {
    let first = [10u8, 20, 30].repeat(4);
    let second = [70u8, 80, 90].repeat(4);
    let old = continuing_blobs(&[&first[..]]);
    let fresh = continuing_blobs(&[&second[..]]);
    let rect = Rect::new(0, 0, 4, 1);

    // Without the reset bit the fresh zlib header is read as deflate data.
    let mut decoder = TightDecoder::default();
    let mut fb = display(4, 1);
    assert!(decode_whole(&mut decoder, rect, &basic_rect(0x00, &old[0]), &mut fb).unwrap());
    let result = decode_whole(&mut decoder, rect, &basic_rect(0x00, &fresh[0]), &mut fb);
    assert!(result.is_err() || fb.to_rgba() != rgba(&second));

    // With it, the same bytes decode.
    let mut decoder = TightDecoder::default();
    let mut fb = display(4, 1);
    assert!(decode_whole(&mut decoder, rect, &basic_rect(0x00, &old[0]), &mut fb).unwrap());
    assert!(decode_whole(&mut decoder, rect, &basic_rect(0x01, &fresh[0]), &mut fb).unwrap());
    assert_eq!(fb.to_rgba(), rgba(&second));
}

#[test]
fn test_streams_are_independent() {
    let a1 = [1u8, 2, 3].repeat(4);
    let a2 = [4u8, 5, 6].repeat(4);
    let b1 = [7u8, 8, 9].repeat(4);
    let b2 = [1u8, 2, 3, 7, 8, 9].repeat(2);
    let stream_a = continuing_blobs(&[&a1[..], &a2[..]]);
    let stream_b = continuing_blobs(&[&b1[..], &b2[..]]);

    let mut decoder = TightDecoder::default();
    let mut fb = display(4, 1);
    let rect = Rect::new(0, 0, 4, 1);

    // Selector 0x0 uses stream 0, selector 0x3 stream 3.
    let steps = [
        (basic_rect(0x00, &stream_a[0]), &a1),
        (basic_rect(0x30, &stream_b[0]), &b1),
        (basic_rect(0x00, &stream_a[1]), &a2),
        (basic_rect(0x30, &stream_b[1]), &b2),
    ];
    for (bytes, expected) in &steps {
        assert!(decode_whole(&mut decoder, rect, bytes, &mut fb).unwrap());
        assert_eq!(fb.to_rgba(), rgba(expected));
    }
}

#[test]
fn test_solid_copy_larger_than_inflate_chunk() {
    let pixels = [0x11u8, 0x11, 0x11].repeat(64 * 64);
    let bytes = large_copy(&pixels);

    // Same picture as a fill rectangle.
    let mut decoder = TightDecoder::default();
    let mut filled = display(64, 64);
    let fill = [0x80, 0x11, 0x11, 0x11];
    assert!(decode_whole(&mut decoder, Rect::new(0, 0, 64, 64), &fill, &mut filled).unwrap());

    let whole = render_large(64, &[&bytes[..]]);
    assert!(whole == filled.to_rgba());
    assert!(whole == rgba(&pixels));

    let bytewise: Vec<&[u8]> = bytes.chunks(1).collect();
    assert!(render_large(64, &bytewise) == rgba(&pixels));
}

#[test]
fn test_striped_copy_larger_than_inflate_chunk() {
    let pixels = striped(96);
    let bytes = large_copy(&pixels);

    assert!(render_large(96, &[&bytes[..]]) == rgba(&pixels));
    let bytewise: Vec<&[u8]> = bytes.chunks(1).collect();
    assert!(render_large(96, &bytewise) == rgba(&pixels));
}

#[tokio::test]
async fn test_decode_from_async_transport() {
    let vectors = checkerboard_vectors();
    let vector = vectors
        .iter()
        .find(|v| v.name == "compressed gradient")
        .unwrap();
    let (rect, bytes) = vector.rects[0].clone();

    let (mut client, mut server) = tokio::io::duplex(8);
    let writer = tokio::spawn(async move {
        for chunk in bytes.chunks(5) {
            server.write_all(chunk).await.unwrap();
            tokio::task::yield_now().await;
        }
    });

    let mut decoder = TightDecoder::default();
    let mut fb = display(4, 4);
    let mut queue = RfbInQueue::with_capacity(16);
    loop {
        let n = queue.fill_from(&mut client).await.unwrap();
        assert!(n > 0, "transport closed before the rectangle completed");
        if decoder
            .decode_rect(&rect, &mut queue, &mut fb, &wire_format())
            .unwrap()
        {
            break;
        }
    }
    writer.await.unwrap();

    assert_eq!(fb.to_rgba(), checkerboard(4, 4));
}

proptest! {
    #[test]
    fn prop_chunking_does_not_change_pixels(
        index in 0usize..8,
        raw_points in prop::collection::vec(1usize..64, 0..6),
    ) {
        let vectors = checkerboard_vectors();
        let vector = &vectors[index];
        let (width, height) = vector.display;

        let pixels = render_vector(vector, |bytes| {
            let mut points: Vec<usize> = raw_points
                .iter()
                .map(|p| p % bytes.len())
                .filter(|&p| p > 0)
                .collect();
            points.sort_unstable();
            points.dedup();
            points
        });

        prop_assert_eq!(pixels, checkerboard(width, height));
    }

    #[test]
    fn prop_chunking_large_rect(
        solid in any::<bool>(),
        raw_points in prop::collection::vec(1usize..4096, 0..8),
    ) {
        let pixels = if solid { [0x11u8, 0x11, 0x11].repeat(64 * 64) } else { striped(64) };
        let bytes = large_copy(&pixels);
        let mut points: Vec<usize> = raw_points
            .iter()
            .map(|p| p % bytes.len())
            .filter(|&p| p > 0)
            .collect();
        points.sort_unstable();
        points.dedup();
        let chunks = split_at_points(&bytes, &points);

        prop_assert!(render_large(64, &chunks) == rgba(&pixels));
    }
}
