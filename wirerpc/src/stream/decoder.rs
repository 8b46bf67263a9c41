//! Streaming frame decoding.
//!
//! This module provides [`FrameDecoder`]: a stream adapter that
//! reassembles length-prefixed frames from arbitrarily fragmented byte
//! chunks and yields the decoded messages.

use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::{Bytes, BytesMut};
use futures::Stream;
use wirerpc_core::{FRAME_HEADER_SIZE, MessageCodec, WireError, check_frame_flags, parse_frame_header};

/// Stream adapter that decodes length-prefixed frames from a byte stream.
///
/// Chunk boundaries carry no meaning: a chunk may hold a fraction of a
/// frame or several frames, and the decoder buffers until a frame is
/// complete. Buffered frames are drained before the inner stream is
/// polled again.
///
/// The byte source ending on a frame boundary ends the stream cleanly;
/// ending inside a frame is a framing error. Any error (framing,
/// unmarshal, or one passed through from the source) is yielded once and
/// ends emission; the buffer is released at that point.
///
/// The codec can be swapped on a live stream with
/// [`set_codec`](FrameDecoder::set_codec); servers that only learn the
/// route mid-stream can equally construct the decoder after routing.
pub struct FrameDecoder<S, C> {
    /// The underlying byte stream.
    stream: S,
    /// Buffer for incomplete frames.
    buffer: BytesMut,
    /// Unmarshalling for each payload.
    codec: C,
    /// Whether the stream has finished (end of source or error).
    finished: bool,
}

impl<S, C> FrameDecoder<S, C> {
    /// Create a new frame decoder over `stream`.
    pub fn new(stream: S, codec: C) -> Self {
        Self {
            stream,
            buffer: BytesMut::new(),
            codec,
            finished: false,
        }
    }

    /// Replace the codec; payloads decoded from here on use the new one.
    pub fn set_codec(&mut self, codec: C) {
        self.codec = codec;
    }

    /// Check if the stream has finished.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    fn fail(&mut self, err: WireError) -> Poll<Option<Result<C::Message, WireError>>>
    where
        C: MessageCodec,
    {
        self.finished = true;
        self.buffer = BytesMut::new();
        Poll::Ready(Some(Err(err)))
    }

    /// Try to slice one complete frame off the buffer.
    ///
    /// Returns:
    /// - `Ok(Some(message))` if a complete frame was decoded
    /// - `Ok(None)` if more data is needed
    /// - `Err(e)` on invalid flags or a failed unmarshal
    fn try_decode_frame(&mut self) -> Result<Option<C::Message>, WireError>
    where
        C: MessageCodec,
    {
        if self.buffer.len() < FRAME_HEADER_SIZE {
            return Ok(None);
        }

        let (flags, length) = parse_frame_header(&self.buffer)?;
        let frame_size = FRAME_HEADER_SIZE + length as usize;

        if self.buffer.len() < frame_size {
            return Ok(None);
        }

        check_frame_flags(flags)?;

        let frame = self.buffer.split_to(frame_size);
        let payload = Bytes::copy_from_slice(&frame[FRAME_HEADER_SIZE..]);

        self.codec.unmarshal(payload).map(Some)
    }
}

impl<S, C> Unpin for FrameDecoder<S, C> where S: Unpin {}

impl<S, C> Stream for FrameDecoder<S, C>
where
    S: Stream<Item = Result<Bytes, WireError>> + Unpin,
    C: MessageCodec,
{
    type Item = Result<C::Message, WireError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        loop {
            if this.finished {
                return Poll::Ready(None);
            }

            // Drain buffered frames before asking the source for more.
            match this.try_decode_frame() {
                Ok(Some(message)) => return Poll::Ready(Some(Ok(message))),
                Ok(None) => {}
                Err(e) => return this.fail(e),
            }

            match Pin::new(&mut this.stream).poll_next(cx) {
                Poll::Ready(Some(Ok(chunk))) => {
                    this.buffer.extend_from_slice(&chunk);
                }
                Poll::Ready(Some(Err(e))) => {
                    return this.fail(e);
                }
                Poll::Ready(None) => {
                    this.finished = true;
                    if !this.buffer.is_empty() {
                        let residual = this.buffer.len();
                        this.buffer = BytesMut::new();
                        return Poll::Ready(Some(Err(WireError::Framing(format!(
                            "stream ended with {} bytes of an incomplete frame",
                            residual
                        )))));
                    }
                    return Poll::Ready(None);
                }
                Poll::Pending => {
                    return Poll::Pending;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use futures::stream;
    use std::sync::Arc;
    use wirerpc_core::{IdentityCodec, RouteCodec, UnmarshalFn, wrap_frame};

    fn chunks(parts: Vec<Vec<u8>>) -> impl Stream<Item = Result<Bytes, WireError>> + Unpin {
        stream::iter(parts.into_iter().map(|p| Ok(Bytes::from(p))))
    }

    #[tokio::test]
    async fn test_decode_single_frame() {
        let source = chunks(vec![wrap_frame(b"hello")]);
        let mut decoder = FrameDecoder::new(source, IdentityCodec);

        let message = decoder.next().await.unwrap().unwrap();
        assert_eq!(message, Bytes::from_static(b"hello"));

        assert!(decoder.next().await.is_none());
        assert!(decoder.is_finished());
    }

    #[tokio::test]
    async fn test_decode_multiple_frames_in_one_chunk() {
        let mut chunk = wrap_frame(b"one");
        chunk.extend_from_slice(&wrap_frame(b"two"));
        chunk.extend_from_slice(&wrap_frame(b"three"));

        let mut decoder = FrameDecoder::new(chunks(vec![chunk]), IdentityCodec);

        for expected in [&b"one"[..], b"two", b"three"] {
            let message = decoder.next().await.unwrap().unwrap();
            assert_eq!(message, Bytes::copy_from_slice(expected));
        }
        assert!(decoder.next().await.is_none());
    }

    #[tokio::test]
    async fn test_decode_fragmented_across_chunks() {
        // Frames for "A" and "BC", split so the second chunk completes the
        // first frame and opens the second.
        let source = chunks(vec![
            vec![0x00, 0x00, 0x00, 0x00, 0x01],
            vec![0x41, 0x00, 0x00, 0x00],
            vec![0x00, 0x02, 0x42, 0x43],
        ]);
        let mut decoder = FrameDecoder::new(source, IdentityCodec);

        let message = decoder.next().await.unwrap().unwrap();
        assert_eq!(message, Bytes::from_static(b"A"));

        let message = decoder.next().await.unwrap().unwrap();
        assert_eq!(message, Bytes::from_static(b"BC"));

        assert!(decoder.next().await.is_none());
    }

    #[tokio::test]
    async fn test_fragmentation_is_invisible() {
        // The same three frames delivered whole, frame-aligned, and byte
        // by byte decode to the same sequence.
        let payloads = [&b""[..], b"\x01\x02\x03", b"longer payload"];
        let mut wire = Vec::new();
        for p in payloads {
            wire.extend_from_slice(&wrap_frame(p));
        }

        let splits: Vec<Vec<Vec<u8>>> = vec![
            vec![wire.clone()],
            payloads.iter().map(|p| wrap_frame(p)).collect(),
            wire.iter().map(|b| vec![*b]).collect(),
        ];

        for parts in splits {
            let mut decoder = FrameDecoder::new(chunks(parts), IdentityCodec);
            for expected in payloads {
                let message = decoder.next().await.unwrap().unwrap();
                assert_eq!(message, Bytes::copy_from_slice(expected));
            }
            assert!(decoder.next().await.is_none());
        }
    }

    #[tokio::test]
    async fn test_zero_length_payload_emits_empty_message() {
        let mut decoder = FrameDecoder::new(chunks(vec![wrap_frame(b"")]), IdentityCodec);
        let message = decoder.next().await.unwrap().unwrap();
        assert!(message.is_empty());
        assert!(decoder.next().await.is_none());
    }

    #[tokio::test]
    async fn test_end_of_source_inside_frame() {
        // Header promises 4 payload bytes; only 2 arrive.
        let source = chunks(vec![vec![0x00, 0x00, 0x00, 0x00, 0x04, 0x41, 0x42]]);
        let mut decoder = FrameDecoder::new(source, IdentityCodec);

        let err = decoder.next().await.unwrap().unwrap_err();
        assert!(matches!(err, WireError::Framing(_)));
        assert!(decoder.next().await.is_none());
    }

    #[tokio::test]
    async fn test_end_of_source_inside_header() {
        let source = chunks(vec![vec![0x00, 0x00, 0x00]]);
        let mut decoder = FrameDecoder::new(source, IdentityCodec);

        let err = decoder.next().await.unwrap().unwrap_err();
        assert!(matches!(err, WireError::Framing(_)));
    }

    #[tokio::test]
    async fn test_empty_source_ends_cleanly() {
        let mut decoder = FrameDecoder::new(chunks(vec![]), IdentityCodec);
        assert!(decoder.next().await.is_none());
    }

    #[tokio::test]
    async fn test_unmarshal_failure_stops_emission() {
        let unmarshal: UnmarshalFn = Arc::new(|b| {
            if b == Bytes::from_static(b"bad") {
                Err("unreadable".into())
            } else {
                Ok(b)
            }
        });
        let mut wire = wrap_frame(b"ok");
        wire.extend_from_slice(&wrap_frame(b"bad"));
        wire.extend_from_slice(&wrap_frame(b"never"));

        let mut decoder = FrameDecoder::new(
            chunks(vec![wire]),
            RouteCodec::new(None, Some(unmarshal)),
        );

        let message = decoder.next().await.unwrap().unwrap();
        assert_eq!(message, Bytes::from_static(b"ok"));

        let err = decoder.next().await.unwrap().unwrap_err();
        assert!(matches!(err, WireError::Unmarshal(_)));

        assert!(decoder.next().await.is_none());
    }

    #[tokio::test]
    async fn test_compressed_flag_rejected() {
        let source = chunks(vec![vec![0x01, 0x00, 0x00, 0x00, 0x01, 0x41]]);
        let mut decoder = FrameDecoder::new(source, IdentityCodec);

        let err = decoder.next().await.unwrap().unwrap_err();
        assert!(matches!(err, WireError::Protocol(_)));
    }

    #[tokio::test]
    async fn test_source_error_passes_through() {
        let source = stream::iter(vec![
            Ok(Bytes::from(wrap_frame(b"ok"))),
            Err(WireError::Framing("connection reset".into())),
        ]);
        let mut decoder = FrameDecoder::new(source, IdentityCodec);

        assert!(decoder.next().await.unwrap().is_ok());
        assert!(decoder.next().await.unwrap().is_err());
        assert!(decoder.next().await.is_none());
    }

    #[tokio::test]
    async fn test_set_codec_mid_stream() {
        // A server reads the first message raw to pick a route, then
        // installs the route's unmarshal for the rest.
        let reverse: UnmarshalFn = Arc::new(|b| {
            let mut v = b.to_vec();
            v.reverse();
            Ok(Bytes::from(v))
        });

        let mut wire = wrap_frame(b"/test/do_reverse");
        wire.extend_from_slice(&wrap_frame(b"abc"));

        let mut decoder = FrameDecoder::new(chunks(vec![wire]), RouteCodec::passthrough());

        let route = decoder.next().await.unwrap().unwrap();
        assert_eq!(route, Bytes::from_static(b"/test/do_reverse"));

        decoder.set_codec(RouteCodec::new(None, Some(reverse)));

        let message = decoder.next().await.unwrap().unwrap();
        assert_eq!(message, Bytes::from_static(b"cba"));
    }
}
