//! Streaming frame codecs.
//!
//! One-shot framing ([`wirerpc_core::encode_message`] and
//! [`wirerpc_core::decode_message`]) covers unary bodies that arrive whole.
//! RPC streams instead see messages one at a time on the send side and
//! arbitrary byte fragments on the receive side; the adapters here bridge
//! both to the frame format:
//!
//! - [`FrameEncoder`]: a message stream in, framed bytes out
//! - [`FrameDecoder`]: byte chunks in, decoded messages out
//!
//! Each adapter instance belongs to a single RPC stream and is not meant
//! for concurrent producers or consumers.

mod decoder;
mod encoder;

pub use decoder::FrameDecoder;
pub use encoder::FrameEncoder;
