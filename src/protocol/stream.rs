//! Frame state machine over a chunked response body.
//!
//! Pulls frames from a [`BufReader`] one at a time:
//! - `AwaitingHeader`: need exactly 4 header bytes
//! - `AwaitingPayload`: header parsed, need `len` payload bytes
//! - `Terminated`: final frame seen or an error occurred
//!
//! Every read races the optional [`CancellationToken`].
//!
//! # Example
//!
//! ```
//! use bytes::Bytes;
//! use futures::stream;
//! use httpwire_client::protocol::{encode_frame, Frame, FrameReader};
//!
//! # futures::executor::block_on(async {
//! let body = vec![
//!     Ok(encode_frame(b"a", false)),
//!     Ok(encode_frame(b"done", true)),
//! ];
//! let mut frames = FrameReader::new(stream::iter(body), 1024);
//! assert_eq!(frames.next_frame().await.unwrap(), Some(Frame::Chunk(Bytes::from_static(b"a"))));
//! assert_eq!(frames.next_frame().await.unwrap(), Some(Frame::Final(Bytes::from_static(b"done"))));
//! assert_eq!(frames.next_frame().await.unwrap(), None);
//! # });
//! ```

use bytes::Bytes;
use futures::Stream;

use super::frame::{Frame, FrameHeader, HEADER_SIZE};
use super::reader::BufReader;
use crate::cancel::{with_cancellation, CancellationToken};
use crate::error::{Result, RpcError};

#[derive(Debug, Clone, Copy)]
enum State {
    AwaitingHeader,
    AwaitingPayload { header: FrameHeader },
    Terminated,
}

/// Reads frames from a chunked response body.
pub struct FrameReader<S> {
    reader: BufReader<S>,
    state: State,
    /// Largest payload accepted before failing with `ChunkTooLarge`.
    max_chunk_size: u32,
    cancel: Option<CancellationToken>,
}

impl<S> FrameReader<S>
where
    S: Stream<Item = Result<Bytes>> + Unpin,
{
    pub fn new(body: S, max_chunk_size: u32) -> Self {
        Self {
            reader: BufReader::new(body),
            state: State::AwaitingHeader,
            max_chunk_size,
            cancel: None,
        }
    }

    /// Abort pending reads when `token` fires.
    pub fn with_cancellation(mut self, token: Option<CancellationToken>) -> Self {
        self.cancel = token;
        self
    }

    #[inline]
    pub fn is_terminated(&self) -> bool {
        matches!(self.state, State::Terminated)
    }

    #[inline]
    pub fn max_chunk_size(&self) -> u32 {
        self.max_chunk_size
    }

    /// Next frame, or `None` once the stream has terminated.
    ///
    /// The stream terminates after a [`Frame::Final`] or after the first
    /// error; later calls return `Ok(None)` without touching the body.
    pub async fn next_frame(&mut self) -> Result<Option<Frame>> {
        let result = self.advance().await;
        match &result {
            Ok(Some(Frame::Final(_))) => self.state = State::Terminated,
            Err(e) => {
                tracing::debug!(error = %e, "frame stream aborted");
                self.state = State::Terminated;
            }
            _ => {}
        }
        result
    }

    async fn advance(&mut self) -> Result<Option<Frame>> {
        loop {
            match self.state {
                State::Terminated => return Ok(None),

                State::AwaitingHeader => {
                    let head = self.read_exact(HEADER_SIZE).await?;
                    let header = FrameHeader::decode([head[0], head[1], head[2], head[3]]);

                    if header.is_terminator() {
                        tracing::debug!("stream terminator received");
                        return Ok(Some(Frame::Final(Bytes::new())));
                    }

                    if header.len > self.max_chunk_size {
                        return Err(RpcError::ChunkTooLarge {
                            len: header.len,
                            max: self.max_chunk_size,
                        });
                    }

                    self.state = State::AwaitingPayload { header };
                }

                State::AwaitingPayload { header } => {
                    let payload = self.read_exact(header.len as usize).await?;
                    self.state = State::AwaitingHeader;

                    tracing::debug!(len = header.len, fin = header.fin, "frame received");
                    return Ok(Some(if header.fin {
                        Frame::Final(payload)
                    } else {
                        Frame::Chunk(payload)
                    }));
                }
            }
        }
    }

    async fn read_exact(&mut self, len: usize) -> Result<Bytes> {
        with_cancellation(self.cancel.as_ref(), self.reader.read_exact(len)).await
    }

    /// Adapt into a `Stream` of frames ending after the final frame.
    pub fn into_stream(self) -> impl Stream<Item = Result<Frame>> {
        futures::stream::unfold(self, |mut frames| async move {
            match frames.next_frame().await {
                Ok(Some(frame)) => Some((Ok(frame), frames)),
                Ok(None) => None,
                Err(e) => Some((Err(e), frames)),
            }
        })
    }
}
