//! RFB pixel buffer types and utilities.
//!
//! This crate provides pixel format descriptions, the [`DisplaySink`] contract that
//! encoding decoders write into, and [`ManagedPixelBuffer`], an owned in-memory sink.

pub mod format;
pub mod managed;
pub mod sink;

pub use format::PixelFormat;
pub use managed::ManagedPixelBuffer;
pub use sink::DisplaySink;
