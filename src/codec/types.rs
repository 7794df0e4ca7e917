//! `Encode` / `Decode` traits and their implementations for std types.
//!
//! Composition is static: `Option<Vec<(u8, String)>>` is encoded by nesting the
//! impls of its parts, so no type tags ever reach the wire.
//!
//! | Type | Wire |
//! |------|------|
//! | `bool` | 1 byte, any nonzero decodes `true` |
//! | `u8`, `i8`, `f32`, `f64` | raw little-endian bytes |
//! | `u16..u128`, `usize` | LEB128 |
//! | `i16..i128`, `isize` | ZigZag + LEB128 |
//! | `char` | LEB128 `u32`, validated on decode |
//! | `String`, `str` | u30 byte length + UTF-8 |
//! | `()` | nothing |
//! | `Option<T>` | bool + `T` |
//! | `Result<T, E>` | bool (1 = `Ok`) + payload |
//! | `[T; N]` | `N` elements |
//! | `Vec<T>`, `[T]` | u30 count + elements |
//! | `BTreeMap`, `HashMap` | u30 count + key/value pairs |
//! | tuples | fields in order |

use std::collections::{BTreeMap, HashMap};
use std::hash::{BuildHasher, Hash};

use super::decoder::Decoder;
use crate::error::{Result, RpcError};
use crate::writer::{BufWriter, Sink};

/// A value that can be written to a [`BufWriter`].
pub trait Encode {
    fn encode<S: Sink>(&self, w: &mut BufWriter<S>) -> Result<()>;
}

/// A value that can be read from a [`Decoder`].
///
/// The `'de` lifetime lets borrowed types like `&str` point into the source.
pub trait Decode<'de>: Sized {
    fn decode(d: &mut Decoder<'de>) -> Result<Self>;
}

/// A [`Decode`] type that borrows nothing from the source.
pub trait DecodeOwned: for<'de> Decode<'de> {}

impl<T> DecodeOwned for T where T: for<'de> Decode<'de> {}

/// Element type of a raw numeric buffer.
pub trait RawElement: Copy {
    /// Encoded width in bytes.
    const SIZE: usize;

    /// Read one element. `bytes` is exactly [`Self::SIZE`] long.
    fn from_le_slice(bytes: &[u8]) -> Self;

    /// Append the little-endian bytes of `self`.
    fn put_le(&self, out: &mut Vec<u8>);

    /// Borrow a whole buffer as bytes when no conversion is needed.
    fn as_bytes(_values: &[Self]) -> Option<&[u8]> {
        None
    }
}

impl RawElement for u8 {
    const SIZE: usize = 1;

    #[inline]
    fn from_le_slice(bytes: &[u8]) -> Self {
        bytes[0]
    }

    #[inline]
    fn put_le(&self, out: &mut Vec<u8>) {
        out.push(*self);
    }

    fn as_bytes(values: &[Self]) -> Option<&[u8]> {
        Some(values)
    }
}

macro_rules! impl_raw_element {
    ($($ty:ty),*) => {$(
        impl RawElement for $ty {
            const SIZE: usize = std::mem::size_of::<$ty>();

            #[inline]
            fn from_le_slice(bytes: &[u8]) -> Self {
                let mut arr = [0u8; std::mem::size_of::<$ty>()];
                arr.copy_from_slice(bytes);
                <$ty>::from_le_bytes(arr)
            }

            #[inline]
            fn put_le(&self, out: &mut Vec<u8>) {
                out.extend_from_slice(&self.to_le_bytes());
            }
        }
    )*};
}

impl_raw_element!(i8, f32, f64);

impl Encode for bool {
    fn encode<S: Sink>(&self, w: &mut BufWriter<S>) -> Result<()> {
        w.bool(*self)
    }
}

impl<'de> Decode<'de> for bool {
    fn decode(d: &mut Decoder<'de>) -> Result<Self> {
        d.bool()
    }
}

macro_rules! impl_raw_scalar {
    ($($ty:ident),*) => {$(
        impl Encode for $ty {
            #[inline]
            fn encode<S: Sink>(&self, w: &mut BufWriter<S>) -> Result<()> {
                w.$ty(*self)
            }
        }

        impl<'de> Decode<'de> for $ty {
            #[inline]
            fn decode(d: &mut Decoder<'de>) -> Result<Self> {
                d.$ty()
            }
        }
    )*};
}

impl_raw_scalar!(u8, i8, f32, f64);

macro_rules! impl_uint {
    ($($ty:ty => $bits:expr),*) => {$(
        impl Encode for $ty {
            #[inline]
            fn encode<S: Sink>(&self, w: &mut BufWriter<S>) -> Result<()> {
                w.uint(*self as u128, $bits)
            }
        }

        impl<'de> Decode<'de> for $ty {
            fn decode(d: &mut Decoder<'de>) -> Result<Self> {
                <$ty>::try_from(d.uint($bits)?).map_err(|_| RpcError::InvalidVarint { bits: $bits })
            }
        }
    )*};
}

impl_uint!(u16 => 16, u32 => 32, u64 => 64, u128 => 128, usize => 64);

macro_rules! impl_int {
    ($($ty:ty => $bits:expr),*) => {$(
        impl Encode for $ty {
            #[inline]
            fn encode<S: Sink>(&self, w: &mut BufWriter<S>) -> Result<()> {
                w.int(*self as i128, $bits)
            }
        }

        impl<'de> Decode<'de> for $ty {
            fn decode(d: &mut Decoder<'de>) -> Result<Self> {
                <$ty>::try_from(d.int($bits)?).map_err(|_| RpcError::InvalidVarint { bits: $bits })
            }
        }
    )*};
}

impl_int!(i16 => 16, i32 => 32, i64 => 64, i128 => 128, isize => 64);

impl Encode for char {
    fn encode<S: Sink>(&self, w: &mut BufWriter<S>) -> Result<()> {
        w.uint(u32::from(*self).into(), 32)
    }
}

impl<'de> Decode<'de> for char {
    fn decode(d: &mut Decoder<'de>) -> Result<Self> {
        let code = u32::decode(d)?;
        char::from_u32(code).ok_or(RpcError::InvalidChar(code))
    }
}

impl Encode for str {
    fn encode<S: Sink>(&self, w: &mut BufWriter<S>) -> Result<()> {
        w.str(self)
    }
}

impl Encode for String {
    fn encode<S: Sink>(&self, w: &mut BufWriter<S>) -> Result<()> {
        w.str(self)
    }
}

impl<'de> Decode<'de> for String {
    fn decode(d: &mut Decoder<'de>) -> Result<Self> {
        d.str().map(str::to_owned)
    }
}

impl<'de> Decode<'de> for &'de str {
    fn decode(d: &mut Decoder<'de>) -> Result<Self> {
        d.str()
    }
}

impl<'de> Decode<'de> for &'de [u8] {
    fn decode(d: &mut Decoder<'de>) -> Result<Self> {
        d.bytes()
    }
}

impl Encode for () {
    fn encode<S: Sink>(&self, _w: &mut BufWriter<S>) -> Result<()> {
        Ok(())
    }
}

impl<'de> Decode<'de> for () {
    fn decode(_d: &mut Decoder<'de>) -> Result<Self> {
        Ok(())
    }
}

impl<T: Encode + ?Sized> Encode for &T {
    #[inline]
    fn encode<S: Sink>(&self, w: &mut BufWriter<S>) -> Result<()> {
        (**self).encode(w)
    }
}

impl<T: Encode + ?Sized> Encode for Box<T> {
    #[inline]
    fn encode<S: Sink>(&self, w: &mut BufWriter<S>) -> Result<()> {
        (**self).encode(w)
    }
}

impl<'de, T: Decode<'de>> Decode<'de> for Box<T> {
    fn decode(d: &mut Decoder<'de>) -> Result<Self> {
        T::decode(d).map(Box::new)
    }
}

impl<T: Encode> Encode for Option<T> {
    fn encode<S: Sink>(&self, w: &mut BufWriter<S>) -> Result<()> {
        w.option(self.as_ref(), |w, v| v.encode(w))
    }
}

impl<'de, T: Decode<'de>> Decode<'de> for Option<T> {
    fn decode(d: &mut Decoder<'de>) -> Result<Self> {
        d.option(T::decode)
    }
}

impl<T: Encode, E: Encode> Encode for std::result::Result<T, E> {
    fn encode<S: Sink>(&self, w: &mut BufWriter<S>) -> Result<()> {
        w.result(self.as_ref(), |w, v| v.encode(w), |w, e| e.encode(w))
    }
}

impl<'de, T: Decode<'de>, E: Decode<'de>> Decode<'de> for std::result::Result<T, E> {
    fn decode(d: &mut Decoder<'de>) -> Result<Self> {
        d.result(T::decode, E::decode)
    }
}

impl<T: Encode, const N: usize> Encode for [T; N] {
    fn encode<S: Sink>(&self, w: &mut BufWriter<S>) -> Result<()> {
        w.fixed_arr(self, |w, v| v.encode(w))
    }
}

impl<'de, T: Decode<'de>, const N: usize> Decode<'de> for [T; N] {
    fn decode(d: &mut Decoder<'de>) -> Result<Self> {
        let values = d.fixed_arr(N, T::decode)?;
        values.try_into().map_err(|v: Vec<T>| RpcError::LengthMismatch {
            expected: N,
            actual: v.len(),
        })
    }
}

impl<T: Encode> Encode for [T] {
    fn encode<S: Sink>(&self, w: &mut BufWriter<S>) -> Result<()> {
        w.arr(self, |w, v| v.encode(w))
    }
}

impl<T: Encode> Encode for Vec<T> {
    fn encode<S: Sink>(&self, w: &mut BufWriter<S>) -> Result<()> {
        self.as_slice().encode(w)
    }
}

impl<'de, T: Decode<'de>> Decode<'de> for Vec<T> {
    fn decode(d: &mut Decoder<'de>) -> Result<Self> {
        d.arr(T::decode)
    }
}

impl<K: Encode, V: Encode> Encode for BTreeMap<K, V> {
    fn encode<S: Sink>(&self, w: &mut BufWriter<S>) -> Result<()> {
        w.map(self.iter(), |w, k| k.encode(w), |w, v| v.encode(w))
    }
}

impl<'de, K: Decode<'de> + Ord, V: Decode<'de>> Decode<'de> for BTreeMap<K, V> {
    fn decode(d: &mut Decoder<'de>) -> Result<Self> {
        d.map(K::decode, V::decode)
    }
}

impl<K: Encode, V: Encode, H> Encode for HashMap<K, V, H> {
    fn encode<S: Sink>(&self, w: &mut BufWriter<S>) -> Result<()> {
        w.map(self.iter(), |w, k| k.encode(w), |w, v| v.encode(w))
    }
}

impl<'de, K, V, H> Decode<'de> for HashMap<K, V, H>
where
    K: Decode<'de> + Eq + Hash,
    V: Decode<'de>,
    H: BuildHasher + Default,
{
    fn decode(d: &mut Decoder<'de>) -> Result<Self> {
        d.map(K::decode, V::decode)
    }
}

macro_rules! impl_tuple {
    ($($idx:tt $name:ident),+) => {
        impl<$($name: Encode),+> Encode for ($($name,)+) {
            fn encode<S: Sink>(&self, w: &mut BufWriter<S>) -> Result<()> {
                $(self.$idx.encode(w)?;)+
                Ok(())
            }
        }

        impl<'de, $($name: Decode<'de>),+> Decode<'de> for ($($name,)+) {
            fn decode(d: &mut Decoder<'de>) -> Result<Self> {
                Ok(($($name::decode(d)?,)+))
            }
        }
    };
}

impl_tuple!(0 A);
impl_tuple!(0 A, 1 B);
impl_tuple!(0 A, 1 B, 2 C);
impl_tuple!(0 A, 1 B, 2 C, 3 D);
impl_tuple!(0 A, 1 B, 2 C, 3 D, 4 E);
impl_tuple!(0 A, 1 B, 2 C, 3 D, 4 E, 5 F);
impl_tuple!(0 A, 1 B, 2 C, 3 D, 4 E, 5 F, 6 G);
impl_tuple!(0 A, 1 B, 2 C, 3 D, 4 E, 5 F, 6 G, 7 H);
