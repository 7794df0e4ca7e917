//! Chunk frame header and frame types.
//!
//! Every chunk of a streamed response is prefixed by a 4-byte header:
//! ```text
//! ┌─────┬────────────────────────────────┐
//! │ FIN │ Payload length                 │
//! │ 1 b │ 31 bits                        │
//! └─────┴────────────────────────────────┘
//!   little-endian u32, FIN = bit 31
//! ```
//!
//! A frame with FIN set carries the terminal result. FIN with length 0 is the
//! bare stream terminator.

use bytes::{BufMut, Bytes, BytesMut};

/// Header size in bytes.
pub const HEADER_SIZE: usize = 4;

/// Largest payload length the header can describe (`2^31 - 1`).
pub const MAX_FRAME_LEN: u32 = 0x7FFF_FFFF;

const FIN_BIT: u32 = 0x8000_0000;

/// Decoded frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Payload length in bytes.
    pub len: u32,
    /// Final frame of the stream.
    pub fin: bool,
}

impl FrameHeader {
    /// Create a header. `len` is masked to 31 bits.
    pub fn new(len: u32, fin: bool) -> Self {
        Self {
            len: len & MAX_FRAME_LEN,
            fin,
        }
    }

    /// Encode to the 4 little-endian wire bytes.
    ///
    /// # Example
    ///
    /// ```
    /// use httpwire_client::protocol::FrameHeader;
    ///
    /// assert_eq!(FrameHeader::new(5, false).encode(), [5, 0, 0, 0]);
    /// assert_eq!(FrameHeader::new(0, true).encode(), [0, 0, 0, 0x80]);
    /// ```
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let raw = if self.fin { self.len | FIN_BIT } else { self.len };
        raw.to_le_bytes()
    }

    /// Decode from the 4 wire bytes.
    pub fn decode(bytes: [u8; HEADER_SIZE]) -> Self {
        let raw = u32::from_le_bytes(bytes);
        Self {
            len: raw & MAX_FRAME_LEN,
            fin: raw & FIN_BIT != 0,
        }
    }

    /// Empty final frame: the stream ends with no terminal payload.
    #[inline]
    pub fn is_terminator(&self) -> bool {
        self.fin && self.len == 0
    }
}

/// One frame pulled from a response stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Intermediate payload.
    Chunk(Bytes),
    /// Terminal payload. Empty for a bare terminator.
    Final(Bytes),
}

impl Frame {
    /// Payload bytes regardless of kind.
    #[inline]
    pub fn payload(&self) -> &Bytes {
        match self {
            Frame::Chunk(b) | Frame::Final(b) => b,
        }
    }

    #[inline]
    pub fn is_final(&self) -> bool {
        matches!(self, Frame::Final(_))
    }

    pub fn into_payload(self) -> Bytes {
        match self {
            Frame::Chunk(b) | Frame::Final(b) => b,
        }
    }
}

/// Build a complete frame (header + payload).
///
/// # Panics
///
/// Panics if `payload` is longer than [`MAX_FRAME_LEN`].
pub fn encode_frame(payload: &[u8], fin: bool) -> Bytes {
    let len = u32::try_from(payload.len())
        .ok()
        .filter(|len| *len <= MAX_FRAME_LEN)
        .unwrap_or_else(|| panic!("frame payload of {} bytes is too large", payload.len()));

    let mut buf = BytesMut::with_capacity(HEADER_SIZE + payload.len());
    buf.put_slice(&FrameHeader::new(len, fin).encode());
    buf.put_slice(payload);
    buf.freeze()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_layout() {
        let header = FrameHeader::new(0x0102_0304, true);
        assert_eq!(header.encode(), [0x04, 0x03, 0x02, 0x81]);
        assert_eq!(FrameHeader::decode(header.encode()), header);
    }

    #[test]
    fn test_fin_bit_is_masked_from_len() {
        let header = FrameHeader::decode([0xFF, 0xFF, 0xFF, 0xFF]);
        assert!(header.fin);
        assert_eq!(header.len, MAX_FRAME_LEN);
        assert!(!header.is_terminator());
    }

    #[test]
    fn test_terminator() {
        assert!(FrameHeader::decode([0, 0, 0, 0x80]).is_terminator());
        assert!(!FrameHeader::decode([0, 0, 0, 0]).is_terminator());
        assert!(!FrameHeader::decode([1, 0, 0, 0x80]).is_terminator());
    }

    #[test]
    fn test_encode_frame() {
        let frame = encode_frame(b"abc", false);
        assert_eq!(&frame[..], &[3, 0, 0, 0, b'a', b'b', b'c']);

        let last = encode_frame(&[], true);
        assert_eq!(&last[..], &[0, 0, 0, 0x80]);
    }

    #[test]
    fn test_frame_accessors() {
        let frame = Frame::Final(Bytes::from_static(b"x"));
        assert!(frame.is_final());
        assert_eq!(frame.payload().as_ref(), b"x");
        assert_eq!(frame.into_payload(), Bytes::from_static(b"x"));
    }
}
