//! Variable-length integer formats.
//!
//! Three independent wire formats:
//!
//! ```text
//! u15  (lengths 0..2^15)   0xxxxxxx | 1xxxxxxx xxxxxxxx
//! u30  (lengths 0..2^30)   NNxxxxxx [xxxxxxxx; NN]   (NN = extra bytes, big-endian)
//! LEB128 (ints 16..128)    1xxxxxxx ... 0xxxxxxx     (little-endian 7-bit groups)
//! ```
//!
//! Signed integers go through ZigZag before LEB128 so that small negative
//! numbers stay short.

use std::ops::Deref;

use crate::error::{Result, RpcError};

/// Largest LEB128 encoding (128-bit value, `ceil(128 / 7)` groups).
pub const MAX_VARINT_LEN: usize = 19;

/// Largest value accepted by the u15 length format.
pub const LEN_U15_MAX: u32 = (1 << 15) - 1;

/// Largest value accepted by the u30 length format.
pub const LEN_U30_MAX: u32 = (1 << 30) - 1;

/// Integer widths carried by the LEB128 format.
pub const SUPPORTED_WIDTHS: [u32; 4] = [16, 32, 64, 128];

/// An encoded integer held on the stack.
#[derive(Clone, Copy)]
pub struct EncodedInt {
    buf: [u8; MAX_VARINT_LEN],
    len: usize,
}

impl EncodedInt {
    fn new() -> Self {
        Self {
            buf: [0; MAX_VARINT_LEN],
            len: 0,
        }
    }

    #[inline]
    fn push(&mut self, byte: u8) {
        self.buf[self.len] = byte;
        self.len += 1;
    }

    fn from_slice(bytes: &[u8]) -> Self {
        let mut out = Self::new();
        bytes.iter().for_each(|b| out.push(*b));
        out
    }
}

impl Deref for EncodedInt {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.buf[..self.len]
    }
}

impl std::fmt::Debug for EncodedInt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

fn overflow(value: impl std::fmt::Display, min: i128, max: u128) -> RpcError {
    RpcError::EncodeOverflow {
        value: value.to_string(),
        min,
        max,
    }
}

/// Encode a length in the u15 format (1 or 2 bytes).
pub fn len_u15(value: u32) -> Result<EncodedInt> {
    if value < (1 << 7) {
        return Ok(EncodedInt::from_slice(&[value as u8]));
    }
    if value <= LEN_U15_MAX {
        return Ok(EncodedInt::from_slice(&[
            0x80 | (value >> 8) as u8,
            (value & 0xFF) as u8,
        ]));
    }
    Err(overflow(value, 0, LEN_U15_MAX.into()))
}

/// Encode a length in the u30 format (1 to 4 bytes).
pub fn len_u30(value: u32) -> Result<EncodedInt> {
    let b4 = (value & 0xFF) as u8;
    let b3 = ((value >> 8) & 0xFF) as u8;
    let b2 = ((value >> 16) & 0xFF) as u8;
    let b1 = ((value >> 24) & 0xFF) as u8;

    match value {
        v if v < (1 << 6) => Ok(EncodedInt::from_slice(&[b4])),
        v if v < (1 << 14) => Ok(EncodedInt::from_slice(&[0x40 | b3, b4])),
        v if v < (1 << 22) => Ok(EncodedInt::from_slice(&[0x80 | b2, b3, b4])),
        v if v <= LEN_U30_MAX => Ok(EncodedInt::from_slice(&[0xC0 | b1, b2, b3, b4])),
        v => Err(overflow(v, 0, LEN_U30_MAX.into())),
    }
}

/// Encode an unsigned value as LEB128 without range checks.
pub fn leb128(mut value: u128) -> EncodedInt {
    let mut out = EncodedInt::new();
    while value > 0x7F {
        out.push((value & 0x7F) as u8 | 0x80);
        value >>= 7;
    }
    out.push(value as u8);
    out
}

/// Map a signed value onto the unsigned ZigZag space.
#[inline]
pub fn zigzag_encode(value: i128) -> u128 {
    ((value << 1) ^ (value >> 127)) as u128
}

/// Reverse [`zigzag_encode`].
#[inline]
pub fn zigzag_decode(value: u128) -> i128 {
    ((value >> 1) as i128) ^ -((value & 1) as i128)
}

/// Upper bound of an unsigned integer of `bits` width.
#[inline]
pub fn unsigned_max(bits: u32) -> u128 {
    debug_assert!(SUPPORTED_WIDTHS.contains(&bits));
    if bits >= 128 {
        u128::MAX
    } else {
        (1u128 << bits) - 1
    }
}

/// Inclusive range of a signed integer of `bits` width.
#[inline]
pub fn signed_range(bits: u32) -> (i128, i128) {
    debug_assert!(SUPPORTED_WIDTHS.contains(&bits));
    if bits >= 128 {
        (i128::MIN, i128::MAX)
    } else {
        let min = -(1i128 << (bits - 1));
        (min, -min - 1)
    }
}

/// Encode an unsigned integer of `bits` width, rejecting out-of-range values.
pub fn encode_unsigned(value: u128, bits: u32) -> Result<EncodedInt> {
    let max = unsigned_max(bits);
    if value > max {
        return Err(overflow(value, 0, max));
    }
    Ok(leb128(value))
}

/// Encode a signed integer of `bits` width (ZigZag + LEB128).
pub fn encode_signed(value: i128, bits: u32) -> Result<EncodedInt> {
    let (min, max) = signed_range(bits);
    if value < min || value > max {
        return Err(overflow(value, min, max.unsigned_abs()));
    }
    Ok(leb128(zigzag_encode(value)))
}

/// Maximum number of LEB128 groups a `bits`-wide value may occupy.
#[inline]
pub fn max_groups(bits: u32) -> usize {
    bits.div_ceil(7) as usize
}

/// Decode an unsigned LEB128 value of `bits` width.
///
/// `next_byte` pulls one byte from the source. At most [`max_groups`] bytes
/// are consumed; a longer sequence or a value wider than `bits` is rejected.
pub fn decode_unsigned(mut next_byte: impl FnMut() -> Result<u8>, bits: u32) -> Result<u128> {
    let limit = max_groups(bits);
    let mut value: u128 = 0;

    for group in 0..limit {
        let byte = next_byte()?;
        let bits_here = (byte & 0x7F) as u128;
        let shift = 7 * group as u32;

        // Bits that would fall off the top of a u128.
        if shift + 7 > 128 && bits_here >> (128 - shift) != 0 {
            return Err(RpcError::InvalidVarint { bits });
        }
        value |= bits_here << shift;

        if byte & 0x80 == 0 {
            if value > unsigned_max(bits) {
                return Err(RpcError::InvalidVarint { bits });
            }
            return Ok(value);
        }
    }
    Err(RpcError::InvalidVarint { bits })
}

/// Decode a ZigZag LEB128 value of `bits` width.
pub fn decode_signed(next_byte: impl FnMut() -> Result<u8>, bits: u32) -> Result<i128> {
    decode_unsigned(next_byte, bits).map(zigzag_decode)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(bytes: &[u8], bits: u32) -> Result<u128> {
        let mut iter = bytes.iter().copied();
        decode_unsigned(
            || iter.next().ok_or(RpcError::InsufficientBytes { needed: 1, remaining: 0 }),
            bits,
        )
    }

    #[test]
    fn test_len_u15_bytes() {
        assert_eq!(&*len_u15(0).unwrap(), &[0]);
        assert_eq!(&*len_u15(127).unwrap(), &[127]);
        assert_eq!(&*len_u15(128).unwrap(), &[128, 128]);
        assert_eq!(&*len_u15(32767).unwrap(), &[255, 255]);
    }

    #[test]
    fn test_len_u15_out_of_range() {
        let err = len_u15(32768).unwrap_err();
        assert!(matches!(err, RpcError::EncodeOverflow { ref value, .. } if value == "32768"));
    }

    #[test]
    fn test_len_u30_breakpoints() {
        assert_eq!(&*len_u30(0).unwrap(), &[0]);
        assert_eq!(&*len_u30(63).unwrap(), &[63]);
        assert_eq!(&*len_u30(64).unwrap(), &[64, 64]);
        assert_eq!(&*len_u30(16383).unwrap(), &[127, 255]);
        assert_eq!(&*len_u30(16384).unwrap(), &[128, 64, 0]);
        assert_eq!(&*len_u30(4194303).unwrap(), &[191, 255, 255]);
        assert_eq!(&*len_u30(4194304).unwrap(), &[192, 64, 0, 0]);
        assert_eq!(&*len_u30(1073741823).unwrap(), &[255, 255, 255, 255]);
    }

    #[test]
    fn test_len_u30_out_of_range() {
        assert!(matches!(
            len_u30(1 << 30),
            Err(RpcError::EncodeOverflow { .. })
        ));
    }

    #[test]
    fn test_leb128_known_vectors() {
        assert_eq!(&*encode_unsigned(0, 16).unwrap(), &[0]);
        assert_eq!(&*encode_unsigned(65535, 16).unwrap(), &[255, 255, 3]);
        assert_eq!(
            &*encode_unsigned(u32::MAX.into(), 32).unwrap(),
            &[255, 255, 255, 255, 15]
        );
        assert_eq!(encode_unsigned(u128::MAX, 128).unwrap().len(), MAX_VARINT_LEN);
    }

    #[test]
    fn test_zigzag_mapping() {
        assert_eq!(zigzag_encode(0), 0);
        assert_eq!(zigzag_encode(-1), 1);
        assert_eq!(zigzag_encode(1), 2);
        assert_eq!(zigzag_encode(-2), 3);
        assert_eq!(zigzag_encode(i64::MIN.into()), u64::MAX as u128);
        assert_eq!(zigzag_encode(i128::MIN), u128::MAX);
        assert_eq!(zigzag_encode(i128::MAX), u128::MAX - 1);

        for v in [0, 1, -1, 63, -64, i16::MIN as i128, i128::MIN, i128::MAX] {
            assert_eq!(zigzag_decode(zigzag_encode(v)), v);
        }
    }

    #[test]
    fn test_unsigned_overflow_rejected() {
        for bits in [16u32, 32, 64] {
            let max = unsigned_max(bits);
            assert!(encode_unsigned(max, bits).is_ok());
            assert!(matches!(
                encode_unsigned(max + 1, bits),
                Err(RpcError::EncodeOverflow { .. })
            ));
        }
    }

    #[test]
    fn test_overflow_reports_exact_value() {
        match encode_unsigned(u128::MAX, 64).unwrap_err() {
            RpcError::EncodeOverflow { value, min, max } => {
                assert_eq!(value, u128::MAX.to_string());
                assert_eq!(min, 0);
                assert_eq!(max, u64::MAX as u128);
            }
            other => panic!("unexpected error: {other}"),
        }

        match encode_signed(i128::MIN, 64).unwrap_err() {
            RpcError::EncodeOverflow { value, min, max } => {
                assert_eq!(value, i128::MIN.to_string());
                assert_eq!(min, i64::MIN as i128);
                assert_eq!(max, i64::MAX as u128);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_signed_overflow_rejected() {
        for bits in [16u32, 32, 64] {
            let (min, max) = signed_range(bits);
            assert!(encode_signed(min, bits).is_ok());
            assert!(encode_signed(max, bits).is_ok());
            assert!(matches!(
                encode_signed(min - 1, bits),
                Err(RpcError::EncodeOverflow { .. })
            ));
            assert!(matches!(
                encode_signed(max + 1, bits),
                Err(RpcError::EncodeOverflow { .. })
            ));
        }
    }

    #[test]
    fn test_decode_round_trip_boundaries() {
        for (value, bits) in [
            (0u128, 16),
            (65535, 16),
            (u32::MAX as u128, 32),
            (u64::MAX as u128, 64),
            (u128::MAX, 128),
        ] {
            let encoded = encode_unsigned(value, bits).unwrap();
            assert_eq!(decode_all(&encoded, bits).unwrap(), value);
        }
    }

    #[test]
    fn test_decode_rejects_overlong_sequence() {
        // u16 allows three groups; a fourth continuation is rejected.
        assert!(matches!(
            decode_all(&[0x80, 0x80, 0x80, 0x00], 16),
            Err(RpcError::InvalidVarint { bits: 16 })
        ));
    }

    #[test]
    fn test_decode_rejects_value_wider_than_width() {
        // 65536 needs 17 bits.
        let encoded = leb128(65536);
        assert!(matches!(
            decode_all(&encoded, 16),
            Err(RpcError::InvalidVarint { bits: 16 })
        ));

        // Last 128-bit group may only carry two bits.
        let mut bytes = vec![0xFF; 18];
        bytes.push(0x04);
        assert!(matches!(
            decode_all(&bytes, 128),
            Err(RpcError::InvalidVarint { bits: 128 })
        ));
    }

    #[test]
    fn test_decode_truncated() {
        assert!(matches!(
            decode_all(&[0xFF, 0xFF], 32),
            Err(RpcError::InsufficientBytes { .. })
        ));
    }
}
