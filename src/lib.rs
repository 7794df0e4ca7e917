//! # httpwire-client
//!
//! Client runtime for a binary RPC protocol carried over HTTP.
//!
//! Generated service stubs use this crate to encode call arguments, POST them,
//! and decode unary or streamed results.
//!
//! ## Architecture
//!
//! - **Codec** ([`codec`], [`writer`]): varint lengths, LEB128 + ZigZag
//!   integers, and `Encode`/`Decode` for std types
//! - **Framing** ([`protocol`]): 4-byte headers with a final flag over a
//!   buffered reader of the response body
//! - **Transport** ([`transport`]): `POST` via `reqwest`, cancellable per call
//!
//! ## Example
//!
//! ```no_run
//! use httpwire_client::{CallOptions, CancellationToken, Client, Encode, HttpTransport};
//!
//! #[tokio::main]
//! async fn main() -> httpwire_client::error::Result<()> {
//!     let client = Client::new(HttpTransport::new("http://127.0.0.1:8080/rpc")?);
//!     let token = CancellationToken::new();
//!
//!     let sum: u64 = client
//!         .unary(3, |w| (1u64, 2u64).encode(w), &CallOptions::new().cancellation(token))
//!         .await?;
//!     println!("{sum}");
//!
//!     client.close().await;
//!     Ok(())
//! }
//! ```

pub mod cancel;
pub mod codec;
pub mod config;
pub mod error;
pub mod protocol;
pub mod transport;
pub mod writer;

mod client;

pub use cancel::CancellationToken;
pub use client::{
    encode_call, make_stream_call, make_unary_call, stream_frames, unary_bytes, CallStream, Client,
    Step,
};
pub use codec::{Decode, DecodeOwned, Decoder, Encode};
pub use config::TransportConfig;
pub use error::RpcError;
pub use transport::{CallOptions, HttpTransport, RpcTransport};
pub use writer::{BufWriter, Sink};
