//! The Tight rectangle decoder.
//!
//! # Wire Format
//!
//! ```text
//! +------------------+
//! | control byte     |  low nibble: zlib stream resets, high nibble: selector
//! +------------------+
//! | [filter id]      |  basic rectangles with the explicit-filter bit only
//! +------------------+
//! | [sub-encoding]   |  fill colour, palette + indices, pixels, or JPEG
//! +------------------+
//! ```
//!
//! Selectors: `0x8` fill, `0x9` JPEG, `0xA` PNG (not supported), and
//! `0x0`-`0x7` basic. For a basic rectangle bits 0-1 of the selector pick the
//! zlib stream and bit 2 says a filter id byte follows; without it the filter
//! is copy.
//!
//! Basic payloads shorter than [`TIGHT_MIN_TO_COMPRESS`] bytes are sent
//! literally. Longer ones are a compact length followed by that many bytes of
//! deflate data for the selected stream.
//!
//! # Resumption
//!
//! `decode_rect` is called repeatedly for the same rectangle until it returns
//! `Ok(true)`. Each step of the rectangle is a state machine variant that
//! only advances once its bytes are fully buffered, so a call that runs out of
//! data returns `Ok(false)` with nothing half-consumed.

use crate::compact::read_compact_length;
use crate::filter::{
    Filter, Palette, WirePixel, FILTER_COPY, FILTER_GRADIENT, FILTER_PALETTE,
};
use crate::jpeg::{JpegCodec, PendingImage, ThreadedJpegCodec};
use crate::zlib::{ZlibStreamPool, ZLIB_STREAM_COUNT};
use crate::{RectDecoder, TightConfig, TightError, ENCODING_TIGHT};
use bytes::BytesMut;
use rfb_common::Rect;
use rfb_pixelbuffer::{DisplaySink, PixelFormat};
use rfb_protocol::RfbInQueue;
use std::sync::Arc;

// Selectors (high nibble of the control byte)
const TIGHT_FILL: u8 = 0x08;
const TIGHT_JPEG: u8 = 0x09;
const TIGHT_PNG: u8 = 0x0A;

// Flags inside a basic selector
const TIGHT_BASIC_MASK: u8 = 0x08;
const TIGHT_STREAM_MASK: u8 = 0x03;
const TIGHT_EXPLICIT_FILTER: u8 = 0x04;

/// Basic payloads shorter than this are sent without zlib.
pub const TIGHT_MIN_TO_COMPRESS: usize = 12;

/// Progress through the rectangle currently being decoded.
#[derive(Debug)]
enum DecodeState {
    AwaitingControl,
    AwaitingFill,
    AwaitingFilterId {
        stream_id: usize,
    },
    AwaitingPaletteSize {
        stream_id: usize,
    },
    AwaitingPaletteColors {
        stream_id: usize,
        palette: Palette,
    },
    AwaitingLiteral {
        filter: Filter,
        len: usize,
    },
    AwaitingLength {
        stream_id: usize,
        filter: Filter,
        expected: usize,
    },
    AwaitingCompressed {
        stream_id: usize,
        filter: Filter,
        remaining: usize,
        expected: usize,
        output: Vec<u8>,
    },
    AwaitingJpegLength,
    AwaitingJpegData {
        remaining: usize,
        data: BytesMut,
    },
    JpegPending(PendingImage),
}

impl DecodeState {
    fn name(&self) -> &'static str {
        match self {
            DecodeState::AwaitingControl => "control",
            DecodeState::AwaitingFill => "fill colour",
            DecodeState::AwaitingFilterId { .. } => "filter id",
            DecodeState::AwaitingPaletteSize { .. } => "palette size",
            DecodeState::AwaitingPaletteColors { .. } => "palette colours",
            DecodeState::AwaitingLiteral { .. } => "literal payload",
            DecodeState::AwaitingLength { .. } => "compact length",
            DecodeState::AwaitingCompressed { .. } => "zlib payload",
            DecodeState::AwaitingJpegLength => "JPEG length",
            DecodeState::AwaitingJpegData { .. } => "JPEG data",
            DecodeState::JpegPending(_) => "JPEG decode",
        }
    }
}

enum Step {
    /// Moved to a new state; keep going.
    Next(DecodeState),
    /// Cannot progress until more bytes (or the JPEG result) arrive.
    Wait(DecodeState),
    Done,
}

#[derive(Debug, Clone, Copy)]
struct InFlight {
    rect: Rect,
    consumed: usize,
    kind: &'static str,
}

/// Decoder for Tight encoding.
///
/// Owns the four zlib streams for the session and the state of the rectangle
/// in flight. One instance per connection.
///
/// # Example
///
/// ```
/// use rfb_tight::{ManagedPixelBuffer, PixelFormat, Rect, RectDecoder, RfbInQueue, TightDecoder};
///
/// let mut decoder = TightDecoder::default();
/// let mut fb = ManagedPixelBuffer::new(4, 4, PixelFormat::rgb888());
/// let mut queue = RfbInQueue::new();
/// let rect = Rect::new(0, 0, 4, 4);
///
/// queue.push(&[0x80, 0xFF]);
/// assert!(!decoder.decode_rect(&rect, &mut queue, &mut fb, &PixelFormat::rgb888()).unwrap());
///
/// queue.push(&[0x88, 0x44]);
/// assert!(decoder.decode_rect(&rect, &mut queue, &mut fb, &PixelFormat::rgb888()).unwrap());
/// assert_eq!(fb.rgba_at(3, 3), Some([0xFF, 0x88, 0x44, 0xFF]));
/// ```
#[derive(Debug)]
pub struct TightDecoder {
    config: TightConfig,
    streams: ZlibStreamPool,
    state: DecodeState,
    in_flight: Option<InFlight>,
    jpeg: Arc<dyn JpegCodec>,
}

impl Default for TightDecoder {
    fn default() -> Self {
        Self::new(TightConfig::default())
    }
}

impl TightDecoder {
    pub fn new(config: TightConfig) -> Self {
        Self {
            config,
            streams: ZlibStreamPool::new(),
            state: DecodeState::AwaitingControl,
            in_flight: None,
            jpeg: Arc::new(ThreadedJpegCodec),
        }
    }

    /// Replace the JPEG codec.
    pub fn with_jpeg_codec(mut self, codec: Arc<dyn JpegCodec>) -> Self {
        self.jpeg = codec;
        self
    }

    pub fn config(&self) -> &TightConfig {
        &self.config
    }

    /// The rectangle started but not yet completed, if any.
    pub fn in_flight(&self) -> Option<Rect> {
        self.in_flight.map(|f| f.rect)
    }

    /// Drop all session state: zlib histories, the rectangle in flight and
    /// any outstanding JPEG decode.
    pub fn reset(&mut self) {
        tracing::debug!("Tight: decoder reset");
        self.streams.reset_all();
        self.abandon();
    }

    fn abandon(&mut self) {
        self.state = DecodeState::AwaitingControl;
        self.in_flight = None;
    }

    fn begin(&mut self, rect: &Rect, queue: &RfbInQueue, pixel_format: &PixelFormat) -> Result<(), TightError> {
        if rect.width > self.config.max_rect_width {
            return Err(TightError::RectTooWide {
                width: rect.width,
                max: self.config.max_rect_width,
            });
        }
        pixel_format
            .validate()
            .map_err(|e| TightError::UnsupportedPixelFormat(e.to_string()))?;

        tracing::debug!(
            target: "rfb_tight::framing",
            "Tight decode start: rect=[{},{} {}x{}] buffer_before={}",
            rect.x, rect.y, rect.width, rect.height,
            queue.available()
        );
        self.in_flight = Some(InFlight {
            rect: *rect,
            consumed: 0,
            kind: "pending",
        });
        Ok(())
    }

    fn set_kind(&mut self, kind: &'static str) {
        if let Some(in_flight) = self.in_flight.as_mut() {
            in_flight.kind = kind;
        }
    }

    /// Run steps until the rectangle completes or needs more input.
    fn drive(
        &mut self,
        rect: &Rect,
        queue: &mut RfbInQueue,
        sink: &mut dyn DisplaySink,
        pixel: &WirePixel,
    ) -> Result<bool, TightError> {
        loop {
            let state = std::mem::replace(&mut self.state, DecodeState::AwaitingControl);
            match self.step(state, rect, queue, sink, pixel)? {
                Step::Next(next) => self.state = next,
                Step::Wait(current) => {
                    tracing::trace!(
                        "Tight: waiting for {}, buffered={}",
                        current.name(),
                        queue.available()
                    );
                    self.state = current;
                    return Ok(false);
                }
                Step::Done => return Ok(true),
            }
        }
    }

    fn step(
        &mut self,
        state: DecodeState,
        rect: &Rect,
        queue: &mut RfbInQueue,
        sink: &mut dyn DisplaySink,
        pixel: &WirePixel,
    ) -> Result<Step, TightError> {
        match state {
            DecodeState::AwaitingControl => {
                let Some(control) = queue.read_u8() else {
                    return Ok(Step::Wait(state));
                };
                self.read_control(control, rect, pixel)
            }

            DecodeState::AwaitingFill => {
                let Some(color) = queue.consume(pixel.size) else {
                    return Ok(Step::Wait(state));
                };
                if !rect.is_empty() {
                    sink.fill_rect(*rect, pixel.to_rgb(&color))?;
                }
                Ok(Step::Done)
            }

            DecodeState::AwaitingFilterId { stream_id } => {
                let Some(filter_id) = queue.read_u8() else {
                    return Ok(Step::Wait(state));
                };
                match filter_id {
                    FILTER_COPY => self.begin_payload(stream_id, Filter::Copy, rect, pixel),
                    FILTER_PALETTE => Ok(Step::Next(DecodeState::AwaitingPaletteSize { stream_id })),
                    FILTER_GRADIENT => self.begin_payload(stream_id, Filter::Gradient, rect, pixel),
                    other => Err(TightError::InvalidFilter(other)),
                }
            }

            DecodeState::AwaitingPaletteSize { stream_id } => {
                let Some(size) = queue.read_u8() else {
                    return Ok(Step::Wait(state));
                };
                let palette = Palette::with_capacity(size as usize + 1, pixel.size);
                Ok(Step::Next(DecodeState::AwaitingPaletteColors { stream_id, palette }))
            }

            DecodeState::AwaitingPaletteColors {
                stream_id,
                mut palette,
            } => {
                let whole = palette.missing().min(queue.available() / pixel.size);
                if let Some(colors) = queue.consume(whole * pixel.size) {
                    palette.extend(&colors);
                }
                if !palette.is_complete() {
                    return Ok(Step::Wait(DecodeState::AwaitingPaletteColors { stream_id, palette }));
                }
                self.begin_payload(stream_id, Filter::Palette(palette), rect, pixel)
            }

            DecodeState::AwaitingLiteral { filter, len } => {
                let Some(data) = queue.consume(len) else {
                    return Ok(Step::Wait(DecodeState::AwaitingLiteral { filter, len }));
                };
                self.finish_filter(&filter, &data, rect, sink, pixel)
            }

            DecodeState::AwaitingLength {
                stream_id,
                filter,
                expected,
            } => {
                let Some(length) = read_compact_length(queue) else {
                    return Ok(Step::Wait(DecodeState::AwaitingLength {
                        stream_id,
                        filter,
                        expected,
                    }));
                };
                self.check_length(length)?;
                tracing::debug!(
                    "Tight: reading {} compressed bytes for {} uncompressed bytes (stream_id={})",
                    length, expected, stream_id
                );
                Ok(Step::Next(DecodeState::AwaitingCompressed {
                    stream_id,
                    filter,
                    remaining: length,
                    expected,
                    output: Vec::with_capacity(expected),
                }))
            }

            DecodeState::AwaitingCompressed {
                stream_id,
                filter,
                mut remaining,
                expected,
                mut output,
            } => {
                let chunk = queue.take_up_to(remaining);
                if !chunk.is_empty() {
                    if let Err(e) = self.streams.inflate(stream_id, &chunk, &mut output, expected) {
                        tracing::warn!("Tight: {}", e);
                        return Err(e);
                    }
                    remaining -= chunk.len();
                }
                if remaining > 0 {
                    return Ok(Step::Wait(DecodeState::AwaitingCompressed {
                        stream_id,
                        filter,
                        remaining,
                        expected,
                        output,
                    }));
                }
                if output.len() != expected {
                    let e = TightError::Zlib {
                        stream_id,
                        reason: format!("produced {} bytes but expected {}", output.len(), expected),
                    };
                    tracing::warn!("Tight: {}", e);
                    return Err(e);
                }
                self.finish_filter(&filter, &output, rect, sink, pixel)
            }

            DecodeState::AwaitingJpegLength => {
                let Some(length) = read_compact_length(queue) else {
                    return Ok(Step::Wait(state));
                };
                self.check_length(length)?;
                Ok(Step::Next(DecodeState::AwaitingJpegData {
                    remaining: length,
                    data: BytesMut::with_capacity(length),
                }))
            }

            DecodeState::AwaitingJpegData {
                mut remaining,
                mut data,
            } => {
                let chunk = queue.take_up_to(remaining);
                remaining -= chunk.len();
                data.extend_from_slice(&chunk);
                if remaining > 0 {
                    return Ok(Step::Wait(DecodeState::AwaitingJpegData { remaining, data }));
                }
                if rect.is_empty() {
                    return Ok(Step::Done);
                }
                tracing::debug!(
                    "Tight JPEG: {} bytes handed to decoder for {}x{}",
                    data.len(),
                    rect.width,
                    rect.height
                );
                let pending = self.jpeg.start(data.freeze(), rect.width, rect.height);
                // The rectangle completes on a later call, once the image is back.
                Ok(Step::Wait(DecodeState::JpegPending(pending)))
            }

            DecodeState::JpegPending(mut pending) => match pending.poll() {
                None => Ok(Step::Wait(DecodeState::JpegPending(pending))),
                Some(Err(e)) => {
                    tracing::warn!("Tight JPEG: decode failed: {:#}", e);
                    Err(TightError::Jpeg(format!("{:#}", e)))
                }
                Some(Ok(image)) => {
                    if image.width != rect.width || image.height != rect.height {
                        tracing::warn!(
                            "Tight JPEG: dimension mismatch (JPEG {}x{} vs rect {}x{})",
                            image.width, image.height, rect.width, rect.height
                        );
                        return Err(TightError::Jpeg(format!(
                            "dimension mismatch (JPEG {}x{} vs rect {}x{})",
                            image.width, image.height, rect.width, rect.height
                        )));
                    }
                    sink.blit(*rect, &image.pixels, &PixelFormat::rgb24())?;
                    Ok(Step::Done)
                }
            },
        }
    }

    fn read_control(&mut self, control: u8, rect: &Rect, pixel: &WirePixel) -> Result<Step, TightError> {
        for stream_id in 0..ZLIB_STREAM_COUNT {
            if control & (1 << stream_id) != 0 {
                tracing::debug!(
                    "Tight: reset zlib stream {} requested (control={:#04x})",
                    stream_id, control
                );
                self.streams.reset(stream_id);
            }
        }

        let selector = control >> 4;
        match selector {
            TIGHT_FILL => {
                self.set_kind("fill");
                Ok(Step::Next(DecodeState::AwaitingFill))
            }
            TIGHT_JPEG => {
                if !self.config.jpeg_enabled {
                    return Err(TightError::JpegDisabled);
                }
                self.set_kind("jpeg");
                Ok(Step::Next(DecodeState::AwaitingJpegLength))
            }
            TIGHT_PNG => Err(TightError::UnsupportedPng),
            basic if basic & TIGHT_BASIC_MASK == 0 => {
                let stream_id = (basic & TIGHT_STREAM_MASK) as usize;
                if basic & TIGHT_EXPLICIT_FILTER != 0 {
                    Ok(Step::Next(DecodeState::AwaitingFilterId { stream_id }))
                } else {
                    self.begin_payload(stream_id, Filter::Copy, rect, pixel)
                }
            }
            _ => Err(TightError::UnknownControl(control)),
        }
    }

    /// Choose literal or compressed framing once the filter is known.
    fn begin_payload(
        &mut self,
        stream_id: usize,
        filter: Filter,
        rect: &Rect,
        pixel: &WirePixel,
    ) -> Result<Step, TightError> {
        filter.check_format(pixel)?;
        self.set_kind(filter.name());

        let len = filter.payload_len(rect, pixel);
        if len < TIGHT_MIN_TO_COMPRESS {
            Ok(Step::Next(DecodeState::AwaitingLiteral { filter, len }))
        } else {
            Ok(Step::Next(DecodeState::AwaitingLength {
                stream_id,
                filter,
                expected: len,
            }))
        }
    }

    fn check_length(&self, length: usize) -> Result<(), TightError> {
        if length == 0 || length > self.config.max_compressed_length {
            return Err(TightError::InvalidCompactLength(length));
        }
        Ok(())
    }

    fn finish_filter(
        &self,
        filter: &Filter,
        data: &[u8],
        rect: &Rect,
        sink: &mut dyn DisplaySink,
        pixel: &WirePixel,
    ) -> Result<Step, TightError> {
        if !rect.is_empty() {
            let pixels = filter.apply(data, rect, pixel)?;
            sink.blit(*rect, &pixels, &pixel.format)?;
        }
        Ok(Step::Done)
    }
}

impl RectDecoder for TightDecoder {
    fn encoding_type(&self) -> i32 {
        ENCODING_TIGHT
    }

    fn decode_rect(
        &mut self,
        rect: &Rect,
        queue: &mut RfbInQueue,
        sink: &mut dyn DisplaySink,
        pixel_format: &PixelFormat,
    ) -> Result<bool, TightError> {
        match self.in_flight {
            Some(in_flight) if in_flight.rect != *rect => {
                return Err(TightError::OutOfOrder {
                    in_flight: in_flight.rect,
                    requested: *rect,
                });
            }
            Some(_) => {}
            None => self.begin(rect, queue, pixel_format)?,
        }

        let pixel = WirePixel::for_format(pixel_format);
        let buffer_before = queue.available();
        let result = self.drive(rect, queue, sink, &pixel);
        let consumed = buffer_before - queue.available();

        match result {
            Ok(done) => {
                let Some(mut in_flight) = self.in_flight.take() else {
                    return Ok(done);
                };
                in_flight.consumed += consumed;
                if done {
                    tracing::debug!(
                        target: "rfb_tight::framing",
                        "Tight decode end ({}): bytes_consumed={}, buffer_after={}",
                        in_flight.kind,
                        in_flight.consumed,
                        queue.available()
                    );
                } else {
                    self.in_flight = Some(in_flight);
                }
                Ok(done)
            }
            Err(e) => {
                self.abandon();
                Err(e)
            }
        }
    }
}
