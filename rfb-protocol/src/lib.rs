//! RFB (Remote Framebuffer) transport plumbing.
//!
//! Handshake, security and session management live elsewhere; this crate only
//! provides the receive side used by rectangle decoders.
//!
//! # Modules
//!
//! - [`io`] - Non-blocking receive queue ([`RfbInQueue`])
//!
//! # Examples
//!
//! ```
//! use rfb_protocol::RfbInQueue;
//!
//! let mut queue = RfbInQueue::new();
//! queue.push(b"RFB 003.008\n");
//! assert_eq!(queue.consume(12).unwrap().as_ref(), b"RFB 003.008\n");
//! ```

pub mod io;

pub use io::RfbInQueue;
