//! Streaming frame encoding.
//!
//! This module provides [`FrameEncoder`]: a stream adapter that frames
//! each message from an inner stream independently.

use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::Stream;
use wirerpc_core::{MessageCodec, WireError, encode_message};

/// Stream adapter that encodes messages into length-prefixed frames.
///
/// Wraps a stream of application messages and yields one framed byte
/// record per message. A marshal failure is yielded once as an error and
/// ends the stream; no further frames are produced.
///
/// The codec can be swapped on a live stream with
/// [`set_codec`](FrameEncoder::set_codec); servers use this to pick the
/// route's marshaller after dispatch. Messages already framed are
/// unaffected.
///
/// # Example
///
/// ```ignore
/// let messages = futures::stream::iter(vec![request_a, request_b]);
/// let mut encoder = FrameEncoder::new(messages, ProstCodec::new());
///
/// while let Some(frame) = encoder.next().await {
///     transport.write(frame?).await?;
/// }
/// ```
pub struct FrameEncoder<S, C> {
    /// The underlying message stream.
    stream: S,
    /// Marshalling for each message.
    codec: C,
    /// Set once a marshal failure has been yielded.
    failed: bool,
}

impl<S, C> FrameEncoder<S, C> {
    /// Create a new frame encoder over `stream`.
    pub fn new(stream: S, codec: C) -> Self {
        Self {
            stream,
            codec,
            failed: false,
        }
    }

    /// Replace the codec; messages polled from here on use the new one.
    pub fn set_codec(&mut self, codec: C) {
        self.codec = codec;
    }

    /// Whether the encoder stopped on a marshal failure.
    pub fn is_failed(&self) -> bool {
        self.failed
    }
}

impl<S, C> Unpin for FrameEncoder<S, C> where S: Unpin {}

impl<S, C> Stream for FrameEncoder<S, C>
where
    S: Stream<Item = C::Message> + Unpin,
    C: MessageCodec,
{
    type Item = Result<Bytes, WireError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        if this.failed {
            return Poll::Ready(None);
        }

        match Pin::new(&mut this.stream).poll_next(cx) {
            Poll::Ready(Some(message)) => match encode_message(&message, &this.codec) {
                Ok(frame) => Poll::Ready(Some(Ok(frame))),
                Err(e) => {
                    this.failed = true;
                    Poll::Ready(Some(Err(e)))
                }
            },
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }
}
