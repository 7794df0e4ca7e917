//! Call helpers used by generated service stubs.
//!
//! A call is a POST whose body is the 2-byte little-endian call id followed by
//! the encoded arguments. Two shapes exist:
//! 1. Unary: the whole response body is the encoded result
//! 2. Streaming: the body is a sequence of frames; every non-final frame is a
//!    yielded item and the final frame carries the return value
//!
//! # Example
//!
//! ```no_run
//! use httpwire_client::{CallOptions, Client, Encode, HttpTransport, Step};
//!
//! # async fn run() -> httpwire_client::error::Result<()> {
//! let client = Client::new(HttpTransport::new("http://127.0.0.1:8080/rpc")?);
//!
//! let greeting: String = client
//!     .unary(1, |w| "world".encode(w), &CallOptions::new())
//!     .await?;
//!
//! let mut ticks = client
//!     .stream::<u32, (), _>(2, |w| 10u32.encode(w), &CallOptions::new())
//!     .await?;
//! while let Some(step) = ticks.next().await? {
//!     match step {
//!         Step::Yield(n) => println!("tick {n}"),
//!         Step::Return(()) => break,
//!     }
//! }
//! # let _ = greeting;
//! # Ok(())
//! # }
//! ```

use std::marker::PhantomData;

use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt};

use crate::cancel::with_cancellation;
use crate::codec::{DecodeOwned, Decoder};
use crate::error::{Result, RpcError};
use crate::protocol::{Frame, FrameReader};
use crate::transport::{BodyStream, CallOptions, RpcTransport};
use crate::writer::BufWriter;

/// One item pulled from a [`CallStream`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step<Y, R> {
    /// Intermediate value.
    Yield(Y),
    /// Terminal value. Nothing follows it.
    Return(R),
}

/// Build a call body: call id, then whatever `encode_args` writes.
pub fn encode_call<F>(id: u16, encode_args: F) -> Result<Bytes>
where
    F: FnOnce(&mut BufWriter<BytesMut>) -> Result<()>,
{
    let mut w = BufWriter::new(BytesMut::new());
    w.u16_le(id)?;
    encode_args(&mut w)?;
    w.flush()?;
    Ok(w.into_inner().freeze())
}

/// Decode a result payload. Bytes left after the value are ignored.
fn decode_payload<R: DecodeOwned>(bytes: &[u8]) -> Result<R> {
    let mut d = Decoder::new(bytes);
    let value = R::decode(&mut d)?;
    if !d.is_empty() {
        tracing::debug!(trailing = d.remaining(), "ignoring bytes after result");
    }
    Ok(value)
}

async fn next_chunk<S>(body: &mut S) -> Result<Option<Bytes>>
where
    S: Stream<Item = Result<Bytes>> + Unpin,
{
    body.next().await.transpose()
}

/// Send a prebuilt body and collect the whole response.
pub async fn unary_bytes<T: RpcTransport>(
    transport: &T,
    body: Bytes,
    options: &CallOptions,
) -> Result<Bytes> {
    let cancel = options.cancel_token();
    let mut response = with_cancellation(cancel, transport.send(body, options)).await?;

    let mut chunks = Vec::new();
    while let Some(chunk) = with_cancellation(cancel, next_chunk(&mut response)).await? {
        chunks.push(chunk);
    }

    if chunks.len() == 1 {
        return Ok(chunks.swap_remove(0));
    }
    let mut buf = BytesMut::with_capacity(chunks.iter().map(Bytes::len).sum());
    chunks.iter().for_each(|c| buf.extend_from_slice(c));
    Ok(buf.freeze())
}

/// Send a prebuilt body and return a frame reader over the response.
pub async fn stream_frames<T: RpcTransport>(
    transport: &T,
    body: Bytes,
    options: &CallOptions,
) -> Result<FrameReader<T::Body>> {
    let response =
        with_cancellation(options.cancel_token(), transport.send(body, options)).await?;
    Ok(FrameReader::new(response, transport.max_chunk_size())
        .with_cancellation(options.cancel.clone()))
}

/// Make a unary call and decode its result.
pub async fn make_unary_call<T, R, F>(
    transport: &T,
    id: u16,
    encode_args: F,
    options: &CallOptions,
) -> Result<R>
where
    T: RpcTransport,
    R: DecodeOwned,
    F: FnOnce(&mut BufWriter<BytesMut>) -> Result<()>,
{
    let body = encode_call(id, encode_args)?;
    tracing::debug!(id, len = body.len(), "unary call");
    let bytes = unary_bytes(transport, body, options).await?;
    decode_payload(&bytes)
}

/// Make a streaming call. Items are pulled with [`CallStream::next`].
pub async fn make_stream_call<T, Y, R, F>(
    transport: &T,
    id: u16,
    encode_args: F,
    options: &CallOptions,
) -> Result<CallStream<Y, R, T::Body>>
where
    T: RpcTransport,
    Y: DecodeOwned,
    R: DecodeOwned,
    F: FnOnce(&mut BufWriter<BytesMut>) -> Result<()>,
{
    let body = encode_call(id, encode_args)?;
    tracing::debug!(id, len = body.len(), "stream call");
    let frames = stream_frames(transport, body, options).await?;
    Ok(CallStream::new(frames))
}

/// Typed view over the frames of a streaming call.
pub struct CallStream<Y, R, S = BodyStream> {
    frames: FrameReader<S>,
    finished: bool,
    _marker: PhantomData<fn() -> (Y, R)>,
}

impl<Y, R, S> CallStream<Y, R, S>
where
    Y: DecodeOwned,
    R: DecodeOwned,
    S: Stream<Item = Result<Bytes>> + Unpin,
{
    pub fn new(frames: FrameReader<S>) -> Self {
        Self {
            frames,
            finished: false,
            _marker: PhantomData,
        }
    }

    /// Pull the next step.
    ///
    /// Returns `Ok(None)` after [`Step::Return`] or after an error.
    pub async fn next(&mut self) -> Result<Option<Step<Y, R>>> {
        if self.finished {
            return Ok(None);
        }
        let step = match self.frames.next_frame().await {
            Ok(Some(Frame::Chunk(payload))) => {
                decode_payload(&payload).map(|y| Some(Step::Yield(y)))
            }
            Ok(Some(Frame::Final(payload))) => {
                self.finished = true;
                decode_payload(&payload).map(|r| Some(Step::Return(r)))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(e),
        };
        if step.is_err() {
            self.finished = true;
        }
        step
    }

    /// Drain the stream into its items and return value.
    pub async fn collect(mut self) -> Result<(Vec<Y>, R)> {
        let mut items = Vec::new();
        loop {
            match self.next().await? {
                Some(Step::Yield(item)) => items.push(item),
                Some(Step::Return(value)) => return Ok((items, value)),
                None => return Err(RpcError::UnexpectedEof),
            }
        }
    }

    #[inline]
    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

/// Thin handle a generated stub keeps around its transport.
#[derive(Debug, Clone)]
pub struct Client<T> {
    transport: T,
}

impl<T: RpcTransport> Client<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    #[inline]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// See [`make_unary_call`].
    pub async fn unary<R, F>(&self, id: u16, encode_args: F, options: &CallOptions) -> Result<R>
    where
        R: DecodeOwned,
        F: FnOnce(&mut BufWriter<BytesMut>) -> Result<()>,
    {
        make_unary_call(&self.transport, id, encode_args, options).await
    }

    /// See [`make_stream_call`].
    pub async fn stream<Y, R, F>(
        &self,
        id: u16,
        encode_args: F,
        options: &CallOptions,
    ) -> Result<CallStream<Y, R, T::Body>>
    where
        Y: DecodeOwned,
        R: DecodeOwned,
        F: FnOnce(&mut BufWriter<BytesMut>) -> Result<()>,
    {
        make_stream_call(&self.transport, id, encode_args, options).await
    }

    pub async fn close(&self) {
        self.transport.close().await
    }
}
