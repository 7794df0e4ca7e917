//! Error types for httpwire-client.

use thiserror::Error;

/// Main error type for all codec and transport operations.
#[derive(Debug, Error)]
pub enum RpcError {
    /// Decode tried to read past the end of the source buffer.
    #[error("insufficient bytes: needed {needed}, {remaining} remaining")]
    InsufficientBytes { needed: usize, remaining: usize },

    /// The chunked response body ended while at least one byte was expected.
    #[error("unexpected EOF")]
    UnexpectedEof,

    /// An exact-length read could not be completed.
    #[error("failed to fill whole buffer")]
    FailedToFillBuffer,

    /// A frame declared a payload larger than the configured maximum.
    #[error("max chunk size is {max}, but actual size is {len} bytes")]
    ChunkTooLarge { len: u32, max: u32 },

    /// A value does not fit the declared width of its wire format.
    ///
    /// `value` is the rejected value in decimal, exact for any `u128` or `i128`.
    #[error("expected min: {min}, max: {max}, but got: {value}")]
    EncodeOverflow { value: String, min: i128, max: u128 },

    /// A fixed-length buffer disagrees with its declared length.
    #[error("expected buffer length: {expected}, but got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    /// The HTTP request failed (network error or non-success status).
    #[error("transport failure: {0}")]
    TransportFailure(String),

    /// The call's cancellation token fired.
    #[error("call cancelled")]
    Cancelled,

    /// A LEB128 integer was longer than its width allows or out of range.
    #[error("invalid varint for {bits}-bit integer")]
    InvalidVarint { bits: u32 },

    /// String bytes were not valid UTF-8.
    #[error("invalid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    /// Decoded scalar is not a valid `char`.
    #[error("invalid char: {0:#x}")]
    InvalidChar(u32),

    /// Unknown enum discriminant while decoding a generated type.
    #[error("unknown {discriminant} discriminator of {ident}")]
    UnknownDiscriminant { ident: String, discriminant: u64 },

    /// The writer was already flushed for this call.
    #[error("writer already flushed")]
    WriterClosed,

    /// A value was decoded but bytes were left over.
    #[error("{0} trailing bytes after value")]
    TrailingBytes(usize),
}

impl From<reqwest::Error> for RpcError {
    fn from(err: reqwest::Error) -> Self {
        RpcError::TransportFailure(err.to_string())
    }
}

/// Result type alias using RpcError.
pub type Result<T> = std::result::Result<T, RpcError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = RpcError::ChunkTooLarge { len: 10, max: 4 };
        assert_eq!(
            err.to_string(),
            "max chunk size is 4, but actual size is 10 bytes"
        );

        let err = RpcError::EncodeOverflow {
            value: "256".to_string(),
            min: 0,
            max: 255,
        };
        assert_eq!(err.to_string(), "expected min: 0, max: 255, but got: 256");

        let err = RpcError::UnknownDiscriminant {
            ident: "Color".to_string(),
            discriminant: 7,
        };
        assert_eq!(err.to_string(), "unknown 7 discriminator of Color");
    }

    #[test]
    fn test_utf8_error_conversion() {
        let bytes = vec![0xff, 0xfe];
        let err: RpcError = std::str::from_utf8(&bytes).unwrap_err().into();
        assert!(matches!(err, RpcError::InvalidUtf8(_)));
    }
}
