//! Pull-based buffered reader over a stream of byte chunks.
//!
//! The reader keeps the unconsumed tail of the most recently pulled chunk as a
//! [`Bytes`] view. Reads are carved off that view with `split_to`, so a read
//! that fits inside one chunk shares its storage. Reads spanning chunks are
//! copied into a fresh buffer.
//!
//! # Example
//!
//! ```
//! use bytes::Bytes;
//! use futures::stream;
//! use httpwire_client::protocol::BufReader;
//!
//! # futures::executor::block_on(async {
//! let chunks = vec![Ok(Bytes::from_static(&[1, 2])), Ok(Bytes::from_static(&[3]))];
//! let mut reader = BufReader::new(stream::iter(chunks));
//! assert_eq!(&reader.read_exact(3).await.unwrap()[..], &[1, 2, 3]);
//! # });
//! ```

use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt};

use crate::error::{Result, RpcError};

/// Buffered reader over a chunk stream.
pub struct BufReader<S> {
    stream: S,
    view: Bytes,
}

impl<S> BufReader<S>
where
    S: Stream<Item = Result<Bytes>> + Unpin,
{
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            view: Bytes::new(),
        }
    }

    /// Unconsumed bytes of the current chunk.
    #[inline]
    pub fn buffered(&self) -> &Bytes {
        &self.view
    }

    /// Pull the next chunk when the view is exhausted.
    async fn fill_buf(&mut self) -> Result<()> {
        if self.view.is_empty() {
            match self.stream.next().await {
                Some(chunk) => self.view = chunk?,
                None => return Err(RpcError::UnexpectedEof),
            }
        }
        Ok(())
    }

    /// Read up to `len` bytes.
    ///
    /// Pulls at most one chunk. Stream end fails with
    /// [`RpcError::UnexpectedEof`] even when `len` is 0. An empty chunk
    /// produces an empty read.
    pub async fn read(&mut self, len: usize) -> Result<Bytes> {
        self.fill_buf().await?;
        let amt = len.min(self.view.len());
        Ok(self.view.split_to(amt))
    }

    /// Read exactly `len` bytes.
    ///
    /// When the first read returns everything it is handed back as is.
    /// Otherwise reads are stitched into a new buffer, and an empty read before
    /// the buffer is full fails with [`RpcError::FailedToFillBuffer`].
    pub async fn read_exact(&mut self, len: usize) -> Result<Bytes> {
        let mut next = self.read(len).await?;
        if next.len() == len {
            return Ok(next);
        }

        let mut buf = BytesMut::with_capacity(len);
        loop {
            buf.extend_from_slice(&next);
            let remaining = len - buf.len();
            if remaining == 0 {
                return Ok(buf.freeze());
            }

            next = self.read(remaining).await?;
            if next.is_empty() {
                return Err(RpcError::FailedToFillBuffer);
            }
        }
    }

    /// Give back the underlying stream. Buffered bytes are dropped.
    pub fn into_inner(self) -> S {
        self.stream
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream::{self, Iter};
    use std::vec::IntoIter;

    type ChunkStream = Iter<IntoIter<Result<Bytes>>>;

    fn reader(chunks: &[&[u8]]) -> BufReader<ChunkStream> {
        let items: Vec<Result<Bytes>> = chunks
            .iter()
            .map(|c| Ok(Bytes::copy_from_slice(c)))
            .collect();
        BufReader::new(stream::iter(items))
    }

    #[tokio::test]
    async fn test_read_partial() {
        let mut r = reader(&[&[0, 1, 2, 3, 4]]);
        assert_eq!(&r.read(2).await.unwrap()[..], &[0, 1]);
        assert!(r.read(0).await.unwrap().is_empty());
        assert_eq!(&r.read(1).await.unwrap()[..], &[2]);
        assert_eq!(&r.read(3).await.unwrap()[..], &[3, 4]);
        assert!(r.buffered().is_empty());
        assert!(matches!(r.read(0).await, Err(RpcError::UnexpectedEof)));
    }

    #[tokio::test]
    async fn test_empty_chunk_gives_empty_read() {
        let mut r = reader(&[&[]]);
        assert!(r.read(1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_chunk_permits_zero_length_read() {
        let mut r = reader(&[&[]]);
        assert!(r.read(0).await.unwrap().is_empty());

        let mut r = reader(&[&[]]);
        assert!(r.read_exact(0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_source_is_eof() {
        let mut r = reader(&[]);
        assert!(matches!(r.read(0).await, Err(RpcError::UnexpectedEof)));
    }

    #[tokio::test]
    async fn test_read_exact_stitching() {
        let chunks: Vec<Bytes> = [&[1u8, 2, 3][..], &[4, 5], &[6, 7, 8], &[9, 10]]
            .iter()
            .map(|c| Bytes::copy_from_slice(c))
            .collect();
        let last = chunks[3].as_ptr();
        let mut r = BufReader::new(stream::iter(chunks.into_iter().map(Ok::<_, RpcError>)));

        let first = r.read_exact(4).await.unwrap();
        assert_eq!(&r.buffered()[..], &[5]);
        let second = r.read_exact(4).await.unwrap();
        assert!(r.buffered().is_empty());
        let third = r.read_exact(2).await.unwrap();
        assert!(r.buffered().is_empty());

        assert_eq!(&first[..], &[1, 2, 3, 4]);
        assert_eq!(&second[..], &[5, 6, 7, 8]);
        assert_eq!(&third[..], &[9, 10]);

        // Aligned read shares the last chunk.
        assert_eq!(third.as_ptr(), last);
    }

    #[tokio::test]
    async fn test_read_exact_zero_copy_within_chunk() {
        let chunk = Bytes::from_static(&[1, 2, 3, 4]);
        let base = chunk.as_ptr();
        let mut r = BufReader::new(stream::iter(vec![Ok(chunk)]));

        let head = r.read_exact(3).await.unwrap();
        assert_eq!(head.as_ptr(), base);
        assert_eq!(&r.buffered()[..], &[4]);
    }

    #[tokio::test]
    async fn test_read_exact_spanning_copies() {
        let first = Bytes::from_static(&[1, 2]);
        let second = Bytes::from_static(&[3, 4]);
        let (p1, p2) = (first.as_ptr(), second.as_ptr());
        let mut r = BufReader::new(stream::iter(vec![Ok(first), Ok(second)]));

        let buf = r.read_exact(3).await.unwrap();
        assert_eq!(&buf[..], &[1, 2, 3]);
        assert_ne!(buf.as_ptr(), p1);
        assert_ne!(buf.as_ptr(), p2);
        assert_eq!(&r.buffered()[..], &[4]);
    }

    #[tokio::test]
    async fn test_read_exact_skips_leading_empty_chunk() {
        let mut r = reader(&[&[], &[1, 2, 3], &[1, 2], &[3, 4, 5], &[6, 7]]);
        assert_eq!(&r.read_exact(3).await.unwrap()[..], &[1, 2, 3]);
        assert!(r.buffered().is_empty());
        assert_eq!(
            &r.read_exact(6).await.unwrap()[..],
            &[1, 2, 3, 4, 5, 6]
        );
        assert_eq!(&r.buffered()[..], &[7]);
    }

    #[tokio::test]
    async fn test_read_exact_failed_to_fill() {
        let mut r = reader(&[&[1, 2], &[]]);
        let err = r.read_exact(3).await.unwrap_err();
        assert!(matches!(err, RpcError::FailedToFillBuffer));
        assert_eq!(err.to_string(), "failed to fill whole buffer");
    }

    #[tokio::test]
    async fn test_read_exact_eof_mid_fill() {
        let mut r = reader(&[&[1, 2]]);
        let err = r.read_exact(3).await.unwrap_err();
        assert!(matches!(err, RpcError::UnexpectedEof));
        assert_eq!(err.to_string(), "unexpected EOF");
    }

    #[tokio::test]
    async fn test_stream_error_propagates() {
        let items = vec![
            Ok(Bytes::from_static(&[1])),
            Err(RpcError::TransportFailure("reset".into())),
        ];
        let mut r = BufReader::new(stream::iter(items));
        assert!(matches!(
            r.read_exact(2).await,
            Err(RpcError::TransportFailure(_))
        ));
    }
}
