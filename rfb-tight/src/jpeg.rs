//! JPEG sub-encoding support.
//!
//! Decoding a JPEG can take far longer than parsing the rest of an update, so
//! the decoder hands the compressed bytes to a [`JpegCodec`] and keeps a
//! [`PendingImage`] in its state. The rectangle completes on a later
//! `decode_rect` call once the image has arrived.

use anyhow::{anyhow, bail, Context, Result};
use bytes::Bytes;
use std::fmt;
use std::io::Cursor;
use tokio::sync::oneshot;
use tokio::sync::oneshot::error::TryRecvError;

/// A decoded image as packed R, G, B bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// An image codec that decodes off the caller's thread.
pub trait JpegCodec: Send + Sync + fmt::Debug {
    /// Begin decoding `data`, expected to be a `width` x `height` image.
    fn start(&self, data: Bytes, width: u32, height: u32) -> PendingImage;
}

/// Receiving half of a decode started by a [`JpegCodec`].
#[derive(Debug)]
pub struct PendingImage {
    rx: oneshot::Receiver<Result<DecodedImage>>,
}

/// Sending half handed to whatever performs the decode.
#[derive(Debug)]
pub struct ImageSender {
    tx: oneshot::Sender<Result<DecodedImage>>,
}

impl ImageSender {
    /// Deliver the result. A pending image whose sender is dropped without
    /// sending resolves to an error.
    pub fn send(self, result: Result<DecodedImage>) {
        // The receiver is gone when the decoder was reset; nothing to do.
        let _ = self.tx.send(result);
    }
}

impl PendingImage {
    pub fn channel() -> (ImageSender, PendingImage) {
        let (tx, rx) = oneshot::channel();
        (ImageSender { tx }, PendingImage { rx })
    }

    /// An image that is already available.
    pub fn ready(result: Result<DecodedImage>) -> Self {
        let (sender, pending) = Self::channel();
        sender.send(result);
        pending
    }

    /// Check for a result without blocking.
    pub fn poll(&mut self) -> Option<Result<DecodedImage>> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Closed) => Some(Err(anyhow!("JPEG decode ended without a result"))),
        }
    }
}

/// Decode a baseline or progressive JPEG to RGB.
pub fn decode_jpeg(data: &[u8]) -> Result<DecodedImage> {
    let mut decoder = jpeg_decoder::Decoder::new(Cursor::new(data));
    let pixels = decoder.decode().context("Failed to decode Tight JPEG data")?;
    let info = decoder
        .info()
        .ok_or_else(|| anyhow!("JPEG decoder missing metadata"))?;

    let pixels = match info.pixel_format {
        jpeg_decoder::PixelFormat::RGB24 => pixels,
        // Gray subsampling
        jpeg_decoder::PixelFormat::L8 => pixels.iter().flat_map(|&l| [l, l, l]).collect(),
        other => bail!("unsupported JPEG pixel format {:?}", other),
    };

    Ok(DecodedImage {
        width: info.width as u32,
        height: info.height as u32,
        pixels,
    })
}

/// Decodes with `jpeg-decoder` on tokio's blocking pool, or on a dedicated
/// thread when called outside a runtime.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadedJpegCodec;

impl JpegCodec for ThreadedJpegCodec {
    fn start(&self, data: Bytes, width: u32, height: u32) -> PendingImage {
        let (sender, pending) = PendingImage::channel();
        let job = move || {
            tracing::trace!("Tight JPEG: decoding {} bytes for {}x{}", data.len(), width, height);
            sender.send(decode_jpeg(&data));
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(job);
            }
            Err(_) => {
                if let Err(e) = std::thread::Builder::new()
                    .name("tight-jpeg".to_string())
                    .spawn(job)
                {
                    // The job and its sender were dropped; the pending image reports it.
                    tracing::warn!("Tight JPEG: failed to spawn decode thread: {}", e);
                }
            }
        }

        pending
    }
}
