//! Codec module - binary encoding for call arguments and results.
//!
//! - [`varint`] - u15/u30 length prefixes and LEB128 + ZigZag integers
//! - [`Decoder`] - cursor over a borrowed byte slice
//! - [`Encode`] / [`Decode`] - traits implemented for primitives and composites
//!
//! Encoding goes through [`BufWriter`](crate::writer::BufWriter); decoding
//! through [`Decoder`].
//!
//! # Example
//!
//! ```
//! use httpwire_client::codec::{decode_from_slice, Encode};
//! use httpwire_client::writer::BufWriter;
//!
//! let mut w = BufWriter::new(Vec::new());
//! (7u32, Some("seven")).encode(&mut w).unwrap();
//! w.flush().unwrap();
//! let bytes = w.into_inner();
//!
//! let (n, name): (u32, Option<String>) = decode_from_slice(&bytes).unwrap();
//! assert_eq!(n, 7);
//! assert_eq!(name.as_deref(), Some("seven"));
//! ```

mod decoder;
mod types;
pub mod varint;

pub use decoder::{decode_from_slice, Decoder};
pub use types::{Decode, DecodeOwned, Encode, RawElement};
