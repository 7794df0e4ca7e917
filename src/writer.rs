//! Buffered writer that batches encoded bytes before handing them to a sink.
//!
//! Small writes are staged in a fixed-capacity scratch buffer. The staged bytes
//! are handed to the [`Sink`] only when the next write would not fit, when a
//! large write needs to bypass the buffer, or on [`BufWriter::flush`].
//!
//! # Architecture
//!
//! ```text
//! encode ─► BufWriter (scratch, 4 KiB) ─► Sink (request body)
//!                 │
//!                 └─ writes >= capacity go straight to the sink
//! ```
//!
//! # Example
//!
//! ```
//! use httpwire_client::writer::BufWriter;
//!
//! let mut w = BufWriter::new(Vec::new());
//! w.u16_le(7).unwrap();
//! w.str("hi").unwrap();
//! w.flush().unwrap();
//! assert_eq!(w.into_inner(), vec![7, 0, 2, b'h', b'i']);
//! ```

use bytes::{BufMut, BytesMut};

use crate::codec::{varint, Encode, RawElement};
use crate::error::{Result, RpcError};

/// Default scratch capacity.
pub const DEFAULT_CAPACITY: usize = 4096;

/// Smallest scratch capacity; smaller requests are rounded up.
pub const MIN_CAPACITY: usize = 512;

/// Destination of the bytes produced by a [`BufWriter`].
pub trait Sink {
    /// Accept a run of bytes. Runs arrive in write order.
    fn write(&mut self, bytes: &[u8]) -> Result<()>;

    /// No further writes will follow for this session.
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

impl Sink for Vec<u8> {
    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        self.extend_from_slice(bytes);
        Ok(())
    }
}

impl Sink for BytesMut {
    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        self.put_slice(bytes);
        Ok(())
    }
}

impl<S: Sink + ?Sized> Sink for &mut S {
    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        (**self).write(bytes)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }
}

/// Fixed-capacity staging buffer in front of a [`Sink`].
pub struct BufWriter<S: Sink> {
    inner: S,
    buf: Box<[u8]>,
    written: usize,
    flushed: bool,
}

impl<S: Sink> BufWriter<S> {
    /// Create a writer with the default 4 KiB scratch buffer.
    pub fn new(inner: S) -> Self {
        Self::with_capacity(inner, DEFAULT_CAPACITY)
    }

    /// Create a writer with a custom scratch capacity (at least 512 bytes).
    pub fn with_capacity(inner: S, capacity: usize) -> Self {
        Self {
            inner,
            buf: vec![0; capacity.max(MIN_CAPACITY)].into_boxed_slice(),
            written: 0,
            flushed: false,
        }
    }

    /// Total scratch capacity.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Bytes that can still be staged without draining.
    #[inline]
    pub fn spare_capacity(&self) -> usize {
        self.buf.len() - self.written
    }

    /// Bytes currently staged and not yet handed to the sink.
    #[inline]
    pub fn buffered(&self) -> &[u8] {
        &self.buf[..self.written]
    }

    /// Get a reference to the sink.
    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    /// Unwrap the sink. Staged bytes that were never flushed are dropped.
    pub fn into_inner(self) -> S {
        self.inner
    }

    fn ensure_open(&self) -> Result<()> {
        if self.flushed {
            return Err(RpcError::WriterClosed);
        }
        Ok(())
    }

    /// Hand the staged bytes to the sink.
    fn write_buf(&mut self) -> Result<()> {
        if self.written > 0 {
            self.inner.write(&self.buf[..self.written])?;
            self.written = 0;
        }
        Ok(())
    }

    /// Stage a small run of bytes.
    fn stage(&mut self, bytes: &[u8]) -> Result<()> {
        self.ensure_open()?;
        if bytes.len() > self.spare_capacity() {
            self.write_buf()?;
        }
        self.buf[self.written..self.written + bytes.len()].copy_from_slice(bytes);
        self.written += bytes.len();
        Ok(())
    }

    /// Write raw bytes.
    ///
    /// Runs at least as large as the whole scratch buffer skip it and go to the
    /// sink directly, after anything already staged.
    pub fn write(&mut self, bytes: &[u8]) -> Result<()> {
        self.ensure_open()?;
        if bytes.len() > self.spare_capacity() {
            self.write_buf()?;
        }
        if bytes.len() >= self.capacity() {
            return self.inner.write(bytes);
        }
        self.stage(bytes)
    }

    /// Drain staged bytes and tell the sink the session is complete.
    ///
    /// Only the first call has any effect.
    pub fn flush(&mut self) -> Result<()> {
        if self.flushed {
            tracing::warn!("BufWriter::flush called more than once, ignoring");
            return Ok(());
        }
        self.write_buf()?;
        self.flushed = true;
        self.inner.flush()
    }

    pub fn u8(&mut self, num: u8) -> Result<()> {
        self.stage(&[num])
    }

    pub fn i8(&mut self, num: i8) -> Result<()> {
        self.stage(&num.to_le_bytes())
    }

    pub fn f32(&mut self, num: f32) -> Result<()> {
        self.stage(&num.to_le_bytes())
    }

    pub fn f64(&mut self, num: f64) -> Result<()> {
        self.stage(&num.to_le_bytes())
    }

    /// Fixed-width little-endian u16, used for the call id.
    pub fn u16_le(&mut self, num: u16) -> Result<()> {
        self.stage(&num.to_le_bytes())
    }

    pub fn bool(&mut self, value: bool) -> Result<()> {
        self.u8(value as u8)
    }

    /// u30 byte length, then UTF-8 bytes.
    pub fn str(&mut self, value: &str) -> Result<()> {
        self.len_u30(len_to_u32(value.len())?)?;
        self.write(value.as_bytes())
    }

    pub fn len_u15(&mut self, num: u32) -> Result<()> {
        let encoded = varint::len_u15(num)?;
        self.stage(&encoded)
    }

    pub fn len_u30(&mut self, num: u32) -> Result<()> {
        let encoded = varint::len_u30(num)?;
        self.stage(&encoded)
    }

    /// LEB128 unsigned integer checked against `bits` width.
    pub fn uint(&mut self, value: u128, bits: u32) -> Result<()> {
        let encoded = varint::encode_unsigned(value, bits)?;
        self.stage(&encoded)
    }

    /// ZigZag LEB128 signed integer checked against `bits` width.
    pub fn int(&mut self, value: i128, bits: u32) -> Result<()> {
        let encoded = varint::encode_signed(value, bits)?;
        self.stage(&encoded)
    }

    /// Encode any [`Encode`] value.
    #[inline]
    pub fn encode<T: Encode + ?Sized>(&mut self, value: &T) -> Result<()> {
        value.encode(self)
    }

    pub fn option<T>(
        &mut self,
        data: Option<&T>,
        value: impl FnOnce(&mut Self, &T) -> Result<()>,
    ) -> Result<()> {
        match data {
            Some(data) => {
                self.u8(1)?;
                value(self, data)
            }
            None => self.u8(0),
        }
    }

    pub fn result<T, E>(
        &mut self,
        data: std::result::Result<&T, &E>,
        ok: impl FnOnce(&mut Self, &T) -> Result<()>,
        err: impl FnOnce(&mut Self, &E) -> Result<()>,
    ) -> Result<()> {
        match data {
            Ok(data) => {
                self.u8(1)?;
                ok(self, data)
            }
            Err(data) => {
                self.u8(0)?;
                err(self, data)
            }
        }
    }

    /// Elements one after another, no prefix.
    pub fn fixed_arr<T>(
        &mut self,
        values: &[T],
        mut value: impl FnMut(&mut Self, &T) -> Result<()>,
    ) -> Result<()> {
        values.iter().try_for_each(|v| value(self, v))
    }

    /// u30 element count, then the elements.
    pub fn arr<T>(
        &mut self,
        values: &[T],
        value: impl FnMut(&mut Self, &T) -> Result<()>,
    ) -> Result<()> {
        self.len_u30(len_to_u32(values.len())?)?;
        self.fixed_arr(values, value)
    }

    /// u30 pair count, then `(key, value)` pairs in iteration order.
    pub fn map<'a, K: 'a, V: 'a>(
        &mut self,
        entries: impl ExactSizeIterator<Item = (&'a K, &'a V)>,
        mut key: impl FnMut(&mut Self, &K) -> Result<()>,
        mut value: impl FnMut(&mut Self, &V) -> Result<()>,
    ) -> Result<()> {
        self.len_u30(len_to_u32(entries.len())?)?;
        for (k, v) in entries {
            key(self, k)?;
            value(self, v)?;
        }
        Ok(())
    }

    /// Raw little-endian buffer whose length the caller declared up front.
    pub fn fixed_buf<T: RawElement>(&mut self, buf: &[T], len: usize) -> Result<()> {
        if buf.len() != len {
            return Err(RpcError::LengthMismatch {
                expected: len,
                actual: buf.len(),
            });
        }
        self.raw(buf)
    }

    /// u30 element count, then a raw little-endian buffer.
    pub fn buf<T: RawElement>(&mut self, buf: &[T]) -> Result<()> {
        self.len_u30(len_to_u32(buf.len())?)?;
        self.raw(buf)
    }

    fn raw<T: RawElement>(&mut self, buf: &[T]) -> Result<()> {
        match T::as_bytes(buf) {
            Some(bytes) => self.write(bytes),
            None => {
                let mut bytes = Vec::with_capacity(buf.len() * T::SIZE);
                buf.iter().for_each(|v| v.put_le(&mut bytes));
                self.write(&bytes)
            }
        }
    }
}

/// Lengths above `u32::MAX` can never fit the u30 format.
pub(crate) fn len_to_u32(len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| RpcError::EncodeOverflow {
        value: len.to_string(),
        min: 0,
        max: varint::LEN_U30_MAX.into(),
    })
}
