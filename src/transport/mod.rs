//! Transport module - moves an encoded call body to the server and hands back
//! the response body as a stream of chunks.
//!
//! - [`RpcTransport`] - the seam the call helpers are written against
//! - [`HttpTransport`] - POST over HTTP(S) via `reqwest`
//!
//! A transport knows nothing about frames or the codec. Unary calls collect the
//! whole body; streaming calls feed it to a
//! [`FrameReader`](crate::protocol::FrameReader).

mod http;

use bytes::Bytes;
use futures::stream::BoxStream;
use futures::Stream;

use crate::cancel::CancellationToken;
use crate::config::DEFAULT_MAX_CHUNK_SIZE;
use crate::error::Result;

pub use http::{HttpTransport, HttpTransportBuilder};

/// Response body of an [`HttpTransport`] call.
pub type BodyStream = BoxStream<'static, Result<Bytes>>;

/// Per-call options.
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    /// Extra headers. They replace transport headers with the same name.
    pub headers: Vec<(String, String)>,
    /// Abort the call when this token fires.
    pub cancel: Option<CancellationToken>,
}

impl CallOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a request header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Attach a cancellation token.
    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    #[inline]
    pub fn cancel_token(&self) -> Option<&CancellationToken> {
        self.cancel.as_ref()
    }
}

/// Sends one request body and returns the response body.
#[allow(async_fn_in_trait)]
pub trait RpcTransport {
    /// Response body chunks in arrival order.
    type Body: Stream<Item = Result<Bytes>> + Unpin;

    /// POST `body` and wait for the response head.
    ///
    /// A non-success status fails with `TransportFailure`.
    async fn send(&self, body: Bytes, options: &CallOptions) -> Result<Self::Body>;

    /// Largest frame payload accepted on streamed responses.
    fn max_chunk_size(&self) -> u32 {
        DEFAULT_MAX_CHUNK_SIZE
    }

    /// Release transport resources. Calls in flight are not affected.
    async fn close(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_options_builder() {
        let token = CancellationToken::new();
        let options = CallOptions::new()
            .header("x-trace", "1")
            .cancellation(token.clone());
        assert_eq!(options.headers, vec![("x-trace".into(), "1".into())]);

        token.cancel();
        assert!(options.cancel_token().is_some_and(|t| t.is_cancelled()));
    }
}
