//! Protocol module - response framing.
//!
//! This module implements the read side of a streamed call:
//! - 4-byte frame header with a final flag
//! - Buffered reader over the response body chunks
//! - Frame state machine yielding payloads in order

mod frame;
mod reader;
mod stream;

pub use frame::{encode_frame, Frame, FrameHeader, HEADER_SIZE, MAX_FRAME_LEN};
pub use reader::BufReader;
pub use stream::FrameReader;
