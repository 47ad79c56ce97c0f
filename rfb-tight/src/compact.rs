//! Tight compact length field.
//!
//! ```text
//! byte0: [c|  bits 0-6  ]
//! byte1: [c|  bits 7-13 ]     present when byte0.c is set
//! byte2: [   bits 14-21 ]     present when byte1.c is set, no continuation
//! ```

use rfb_protocol::RfbInQueue;

/// Parse a compact length from the front of `bytes`.
///
/// Returns the value and the number of bytes it occupied, or `None` when the
/// continuation bits ask for more bytes than `bytes` holds.
pub fn parse_compact_length(bytes: &[u8]) -> Option<(usize, usize)> {
    let b0 = *bytes.first()?;
    let mut length = (b0 & 0x7F) as usize;
    if b0 & 0x80 == 0 {
        return Some((length, 1));
    }

    let b1 = *bytes.get(1)?;
    length |= ((b1 & 0x7F) as usize) << 7;
    if b1 & 0x80 == 0 {
        return Some((length, 2));
    }

    let b2 = *bytes.get(2)?;
    length |= (b2 as usize) << 14;
    Some((length, 3))
}

/// Read a compact length from the queue.
///
/// Nothing is consumed unless the whole field is buffered.
pub fn read_compact_length(queue: &mut RfbInQueue) -> Option<usize> {
    let buffered = queue.peek(queue.available().min(3))?;
    let (length, used) = parse_compact_length(buffered)?;
    queue.skip(used);
    Some(length)
}

/// Encode `length` the way a Tight server frames it.
///
/// # Panics
///
/// Panics if `length` does not fit in 22 bits.
pub fn encode_compact_length(length: usize) -> Vec<u8> {
    assert!(length <= 0x3F_FFFF, "compact length {} exceeds 22 bits", length);
    let mut out = Vec::with_capacity(3);
    out.push((length & 0x7F) as u8);
    if length > 0x7F {
        out[0] |= 0x80;
        out.push(((length >> 7) & 0x7F) as u8);
        if length > 0x3FFF {
            out[1] |= 0x80;
            out.push((length >> 14) as u8);
        }
    }
    out
}
