//! HTTP transport on top of `reqwest`.
//!
//! Every call is a single `POST` of the encoded body. The response body is
//! handed back as a byte-chunk stream; chunk boundaries are whatever the
//! network delivers and carry no meaning.
//!
//! # Example
//!
//! ```no_run
//! use httpwire_client::transport::HttpTransport;
//!
//! let transport = HttpTransport::builder("http://127.0.0.1:8080/rpc")
//!     .header("authorization", "Bearer token")
//!     .max_chunk_size(1024 * 1024)
//!     .timeout_secs(30)
//!     .build()
//!     .unwrap();
//! # let _ = transport;
//! ```

use bytes::Bytes;
use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::Url;

use super::{BodyStream, CallOptions, RpcTransport};
use crate::cancel::with_cancellation;
use crate::config::TransportConfig;
use crate::error::{Result, RpcError};

const OCTET_STREAM: &str = "application/octet-stream";

/// Builder for [`HttpTransport`].
#[derive(Debug, Clone)]
pub struct HttpTransportBuilder {
    url: String,
    config: TransportConfig,
}

impl HttpTransportBuilder {
    /// Start from the default [`TransportConfig`].
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            config: TransportConfig::default(),
        }
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: TransportConfig) -> Self {
        self.config = config;
        self
    }

    /// Add a header sent with every request.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.headers.push((name.into(), value.into()));
        self
    }

    /// Set the largest accepted frame payload.
    ///
    /// Default: 8 MiB
    pub fn max_chunk_size(mut self, size: u32) -> Self {
        self.config.max_chunk_size = size;
        self
    }

    /// Pool idle connections between calls.
    ///
    /// Default: true
    pub fn keep_alive(mut self, enabled: bool) -> Self {
        self.config.keep_alive = enabled;
        self
    }

    /// Set the whole-request timeout.
    ///
    /// Default: none
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.config.timeout_secs = Some(secs);
        self
    }

    /// Validate the URL and headers and create the HTTP client.
    pub fn build(self) -> Result<HttpTransport> {
        let url = Url::parse(&self.url).map_err(|e| {
            RpcError::TransportFailure(format!("invalid url {:?}: {}", self.url, e))
        })?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(OCTET_STREAM));
        merge_headers(&mut headers, &self.config.headers)?;

        let mut client = reqwest::Client::builder();
        if !self.config.keep_alive {
            client = client.pool_max_idle_per_host(0);
        }
        if let Some(timeout) = self.config.timeout() {
            client = client.timeout(timeout);
        }

        Ok(HttpTransport {
            client: client.build()?,
            url,
            headers,
            config: self.config,
        })
    }
}

/// RPC transport that POSTs call bodies to one URL.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    url: Url,
    /// Default headers with the config headers already applied.
    headers: HeaderMap,
    config: TransportConfig,
}

impl HttpTransport {
    pub fn builder(url: impl Into<String>) -> HttpTransportBuilder {
        HttpTransportBuilder::new(url)
    }

    /// Transport with the default configuration.
    pub fn new(url: impl Into<String>) -> Result<Self> {
        Self::builder(url).build()
    }

    #[inline]
    pub fn url(&self) -> &Url {
        &self.url
    }

    #[inline]
    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    fn request_headers(&self, options: &CallOptions) -> Result<HeaderMap> {
        let mut headers = self.headers.clone();
        merge_headers(&mut headers, &options.headers)?;
        Ok(headers)
    }
}

impl RpcTransport for HttpTransport {
    type Body = BodyStream;

    async fn send(&self, body: Bytes, options: &CallOptions) -> Result<BodyStream> {
        let headers = self.request_headers(options)?;
        tracing::debug!(url = %self.url, len = body.len(), "sending call");

        let request = self.client.post(self.url.clone()).headers(headers).body(body);
        let response = with_cancellation(options.cancel_token(), async move {
            request.send().await.map_err(RpcError::from)
        })
        .await?;

        let status = response.status();
        if !status.is_success() {
            tracing::debug!(status = status.as_u16(), "call rejected");
            return Err(RpcError::TransportFailure(format!(
                "status {}",
                status.as_u16()
            )));
        }

        Ok(response
            .bytes_stream()
            .map(|chunk| chunk.map_err(RpcError::from))
            .boxed())
    }

    fn max_chunk_size(&self) -> u32 {
        self.config.max_chunk_size
    }

    async fn close(&self) {
        tracing::debug!(url = %self.url, "transport closed");
    }
}

/// Insert `extra` into `headers`, replacing entries with the same name.
fn merge_headers(headers: &mut HeaderMap, extra: &[(String, String)]) -> Result<()> {
    for (name, value) in extra {
        let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
            RpcError::TransportFailure(format!("invalid header name {:?}: {}", name, e))
        })?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| RpcError::TransportFailure(format!("invalid header value: {}", e)))?;
        headers.insert(name, value);
    }
    Ok(())
}
