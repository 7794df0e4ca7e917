//! Cursor-based decoder over a borrowed byte slice.
//!
//! Every read checks `offset + amount <= len` before advancing. A failed read
//! leaves the offset untouched and reports [`RpcError::InsufficientBytes`].
//!
//! # Example
//!
//! ```
//! use httpwire_client::codec::Decoder;
//!
//! let bytes = [5, b'h', b'e', b'l', b'l', b'o', 1];
//! let mut d = Decoder::new(&bytes);
//! assert_eq!(d.str().unwrap(), "hello");
//! assert!(d.bool().unwrap());
//! assert!(d.is_empty());
//! ```

use super::types::{Decode, RawElement};
use super::varint;
use crate::error::{Result, RpcError};

/// Read cursor over an immutable byte source.
#[derive(Debug, Clone)]
pub struct Decoder<'de> {
    data: &'de [u8],
    offset: usize,
}

impl<'de> Decoder<'de> {
    /// Create a decoder positioned at the start of `data`.
    pub fn new(data: &'de [u8]) -> Self {
        Self { data, offset: 0 }
    }

    /// Current read offset.
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Number of unread bytes.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    /// Check whether every byte has been consumed.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Take `amt` bytes, advancing only if they are all present.
    pub fn take(&mut self, amt: usize) -> Result<&'de [u8]> {
        let end = self
            .offset
            .checked_add(amt)
            .filter(|end| *end <= self.data.len())
            .ok_or(RpcError::InsufficientBytes {
                needed: amt,
                remaining: self.remaining(),
            })?;
        let bytes = &self.data[self.offset..end];
        self.offset = end;
        Ok(bytes)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub fn u8(&mut self) -> Result<u8> {
        Ok(self.take_array::<1>()?[0])
    }

    pub fn i8(&mut self) -> Result<i8> {
        Ok(i8::from_le_bytes(self.take_array()?))
    }

    pub fn f32(&mut self) -> Result<f32> {
        Ok(f32::from_le_bytes(self.take_array()?))
    }

    pub fn f64(&mut self) -> Result<f64> {
        Ok(f64::from_le_bytes(self.take_array()?))
    }

    /// Fixed-width little-endian u16 (call ids), not a varint.
    pub fn u16_le(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.take_array()?))
    }

    /// Any nonzero byte decodes as `true`.
    pub fn bool(&mut self) -> Result<bool> {
        Ok(self.u8()? != 0)
    }

    /// u30-length-prefixed UTF-8, borrowed from the source.
    pub fn str(&mut self) -> Result<&'de str> {
        let len = self.len_u30()? as usize;
        Ok(std::str::from_utf8(self.take(len)?)?)
    }

    pub fn len_u15(&mut self) -> Result<u16> {
        let b1 = self.u8()?;
        if b1 >> 7 == 0 {
            return Ok(b1.into());
        }
        let b2 = self.u8()?;
        Ok((u16::from(b1 & 0x7F) << 8) | u16::from(b2))
    }

    pub fn len_u30(&mut self) -> Result<u32> {
        let first = self.u8()?;
        let extra = first >> 6;
        let mut num = u32::from(first & 0x3F);
        for _ in 0..extra {
            num = (num << 8) | u32::from(self.u8()?);
        }
        Ok(num)
    }

    /// LEB128 unsigned integer of `bits` width (16, 32, 64 or 128).
    pub fn uint(&mut self, bits: u32) -> Result<u128> {
        varint::decode_unsigned(|| self.u8(), bits)
    }

    /// ZigZag LEB128 signed integer of `bits` width.
    pub fn int(&mut self, bits: u32) -> Result<i128> {
        varint::decode_signed(|| self.u8(), bits)
    }

    /// Decode any [`Decode`] type at the cursor.
    #[inline]
    pub fn decode<T: Decode<'de>>(&mut self) -> Result<T> {
        T::decode(self)
    }

    pub fn option<T>(&mut self, value: impl FnOnce(&mut Self) -> Result<T>) -> Result<Option<T>> {
        if self.bool()? {
            return value(self).map(Some);
        }
        Ok(None)
    }

    pub fn result<T, E>(
        &mut self,
        ok: impl FnOnce(&mut Self) -> Result<T>,
        err: impl FnOnce(&mut Self) -> Result<E>,
    ) -> Result<std::result::Result<T, E>> {
        if self.bool()? {
            return ok(self).map(Ok);
        }
        err(self).map(Err)
    }

    /// Exactly `len` elements, no prefix.
    pub fn fixed_arr<T>(
        &mut self,
        len: usize,
        mut value: impl FnMut(&mut Self) -> Result<T>,
    ) -> Result<Vec<T>> {
        let mut values = Vec::with_capacity(len.min(self.remaining()));
        for _ in 0..len {
            values.push(value(self)?);
        }
        Ok(values)
    }

    /// u30 element count, then the elements.
    ///
    /// A count larger than the remaining input only holds if every element
    /// consumes input; a zero-width element under such a count fails with
    /// [`RpcError::InsufficientBytes`].
    pub fn arr<T>(&mut self, mut value: impl FnMut(&mut Self) -> Result<T>) -> Result<Vec<T>> {
        let len = self.len_u30()? as usize;
        if len <= self.remaining() {
            return self.fixed_arr(len, value);
        }

        let mut values = Vec::with_capacity(self.remaining());
        for _ in 0..len {
            let start = self.offset;
            values.push(value(self)?);
            if self.offset == start {
                return Err(RpcError::InsufficientBytes {
                    needed: len,
                    remaining: self.remaining(),
                });
            }
        }
        Ok(values)
    }

    /// Raw little-endian buffer of `len` elements.
    pub fn fixed_buf<T: RawElement>(&mut self, len: usize) -> Result<Vec<T>> {
        let byte_len = len.checked_mul(T::SIZE).ok_or(RpcError::InsufficientBytes {
            needed: usize::MAX,
            remaining: self.remaining(),
        })?;
        let bytes = self.take(byte_len)?;
        Ok(bytes.chunks_exact(T::SIZE).map(T::from_le_slice).collect())
    }

    /// u30 element count, then a raw little-endian buffer.
    pub fn buf<T: RawElement>(&mut self) -> Result<Vec<T>> {
        let len = self.len_u30()? as usize;
        self.fixed_buf(len)
    }

    /// Borrow a u30-length-prefixed byte buffer without copying.
    pub fn bytes(&mut self) -> Result<&'de [u8]> {
        let len = self.len_u30()? as usize;
        self.take(len)
    }

    /// u30 pair count, then `(key, value)` pairs collected into `M`.
    pub fn map<K, V, M>(
        &mut self,
        mut key: impl FnMut(&mut Self) -> Result<K>,
        mut value: impl FnMut(&mut Self) -> Result<V>,
    ) -> Result<M>
    where
        M: FromIterator<(K, V)>,
    {
        let len = self.len_u30()? as usize;
        let overlong = len > self.remaining();
        (0..len)
            .map(|_| {
                let start = self.offset;
                let k = key(self)?;
                let v = value(self)?;
                if overlong && self.offset == start {
                    return Err(RpcError::InsufficientBytes {
                        needed: len,
                        remaining: self.remaining(),
                    });
                }
                Ok((k, v))
            })
            .collect()
    }

    /// Error for an enum discriminant the generated code does not know.
    pub fn enum_err(ident: &str, discriminant: u64) -> RpcError {
        RpcError::UnknownDiscriminant {
            ident: ident.to_string(),
            discriminant,
        }
    }

    /// Fail if any bytes are left unread.
    pub fn finish(self) -> Result<()> {
        match self.remaining() {
            0 => Ok(()),
            n => Err(RpcError::TrailingBytes(n)),
        }
    }
}

/// Decode exactly one value from `bytes`.
pub fn decode_from_slice<'de, T: Decode<'de>>(bytes: &'de [u8]) -> Result<T> {
    let mut decoder = Decoder::new(bytes);
    let value = T::decode(&mut decoder)?;
    decoder.finish()?;
    Ok(value)
}
