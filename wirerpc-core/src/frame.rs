//! Length-prefixed message framing.
//!
//! Every application message travels as one frame:
//!
//! ```text
//! [flags:1][length:4][payload:length]
//! ```
//!
//! The length is big-endian. Bit 0 of the flags byte is reserved for
//! compression and is never set by this crate; the algorithm behind it is
//! the transport's concern.

use bytes::Bytes;

use crate::codec::MessageCodec;
use crate::error::WireError;

/// Frame flags.
pub mod frame_flags {
    /// Identity (uncompressed) message.
    pub const MESSAGE: u8 = 0x00;
    /// Compressed message. Reserved; frames carrying it are rejected.
    pub const COMPRESSED: u8 = 0x01;
}

/// Frame header size (flags + length). Also the minimum frame size.
pub const FRAME_HEADER_SIZE: usize = 5;

/// Wrap payload bytes in a frame.
///
/// Frame format: `[flags:1][length:4][payload]`. The flags byte is always
/// [`frame_flags::MESSAGE`].
pub fn wrap_frame(payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(FRAME_HEADER_SIZE + payload.len());
    frame.push(frame_flags::MESSAGE);
    frame.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    frame.extend_from_slice(payload);
    frame
}

/// Parse a frame header from bytes.
///
/// Returns `(flags, length)` if successful.
///
/// # Errors
/// Returns an out-of-range error if there aren't enough bytes for the
/// header.
pub fn parse_frame_header(data: &[u8]) -> Result<(u8, u32), WireError> {
    if data.len() < FRAME_HEADER_SIZE {
        return Err(WireError::OutOfRange(format!(
            "incomplete frame header: expected {} bytes, got {}",
            FRAME_HEADER_SIZE,
            data.len()
        )));
    }

    let flags = data[0];
    let length = u32::from_be_bytes([data[1], data[2], data[3], data[4]]);

    Ok((flags, length))
}

/// Validate the flags byte of a frame.
///
/// Only [`frame_flags::MESSAGE`] is accepted. The compressed bit is
/// reserved for the transport and no algorithm is defined here, so a set
/// bit is a protocol error, as is any unknown flag.
pub fn check_frame_flags(flags: u8) -> Result<(), WireError> {
    match flags {
        frame_flags::MESSAGE => Ok(()),
        frame_flags::COMPRESSED => Err(WireError::Protocol(
            "compressed frames are not supported".into(),
        )),
        other => Err(WireError::Protocol(format!(
            "invalid frame flags: 0x{:02x}",
            other
        ))),
    }
}

/// Marshal a message and wrap it in a frame.
///
/// A marshal failure yields the error and no output.
pub fn encode_message<C>(message: &C::Message, codec: &C) -> Result<Bytes, WireError>
where
    C: MessageCodec,
{
    let payload = codec.marshal(message)?;
    Ok(Bytes::from(wrap_frame(&payload)))
}

/// Decode a complete frame back into a message.
///
/// `data` must hold exactly one frame: the declared length and the bytes
/// after the header have to agree.
pub fn decode_message<C>(data: &[u8], codec: &C) -> Result<C::Message, WireError>
where
    C: MessageCodec,
{
    let (flags, length) = parse_frame_header(data)?;
    check_frame_flags(flags)?;

    let payload = &data[FRAME_HEADER_SIZE..];
    if payload.len() != length as usize {
        return Err(WireError::OutOfRange(format!(
            "frame declares {} payload bytes but carries {}",
            length,
            payload.len()
        )));
    }

    codec.unmarshal(Bytes::copy_from_slice(payload))
}
