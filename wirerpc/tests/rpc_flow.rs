//! End-to-end exercise of the registry and the streaming codecs: an
//! application is declared, frozen, and driven the way a serving transport
//! would drive it, with request bytes flowing through the route's codec
//! pair and handler.

use std::sync::Arc;

use bytes::Bytes;
use futures::stream;
use futures::StreamExt;
use wirerpc::prelude::*;
use wirerpc::{MarshalFn, ProstCodec, UnmarshalFn, wrap_frame};

fn reverse_bytes(b: &[u8]) -> Bytes {
    let mut v = b.to_vec();
    v.reverse();
    Bytes::from(v)
}

fn build_app() -> RpcApp {
    let basic = Service::new("basic", [Method::new("noop")]).unwrap();

    let marshal: MarshalFn = Arc::new(|b| Ok(reverse_bytes(b)));
    let unmarshal: UnmarshalFn = Arc::new(|b| Ok(reverse_bytes(&b)));
    let test = Service::new(
        "test",
        [Method::new("do_reverse")
            .with_marshal(marshal)
            .with_unmarshal(unmarshal)],
    )
    .unwrap();

    RpcApp::with_services([basic, test]).unwrap()
}

fn echo_handler() -> HandlerFn {
    Arc::new(|request| Box::pin(async move { Ok(request) }))
}

#[tokio::test]
async fn serve_request_through_route_codec() {
    let mut app = build_app();
    app.register("/basic/noop", echo_handler()).unwrap();
    app.register("/test/do_reverse", echo_handler()).unwrap();
    assert!(app.is_complete());
    app.freeze();

    // A client sends two request messages for /test/do_reverse; the
    // transport decodes them through the route's unmarshal.
    let route = "/test/do_reverse";
    let mut wire = wrap_frame(b"abc");
    wire.extend_from_slice(&wrap_frame(b"wire"));

    let source = stream::iter(vec![Ok::<_, WireError>(Bytes::from(wire))]);
    let mut requests = FrameDecoder::new(source, app.route_codec(route).unwrap());

    let handler = app.handler(route).unwrap();
    let mut responses = Vec::new();
    while let Some(request) = requests.next().await {
        responses.push(handler(request.unwrap()).await.unwrap());
    }

    // do_reverse unmarshals by reversing the payload.
    assert_eq!(responses, [Bytes::from_static(b"cba"), Bytes::from_static(b"eriw")]);

    // The responses go back out through the route's marshal.
    let mut frames = FrameEncoder::new(
        stream::iter(responses),
        app.route_codec(route).unwrap(),
    );
    let frame = frames.next().await.unwrap().unwrap();
    assert_eq!(&frame[5..], b"abc");
}

#[tokio::test]
async fn unhandled_route_reported_before_serving() {
    let mut app = build_app();
    app.register("/basic/noop", echo_handler()).unwrap();

    assert!(!app.is_complete());
    assert_eq!(app.missing_routes(), ["/test/do_reverse"]);
    assert!(app.handler("/test/do_reverse").is_none());

    // The transport answers routes like this one "unimplemented"; the
    // registry only reports them.
    assert!(!app.has_route("/test/do_reverse"));
}

#[derive(Clone, PartialEq, Default)]
struct EchoRequest {
    text: String,
}

impl std::fmt::Debug for EchoRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EchoRequest").field("text", &self.text).finish()
    }
}

impl prost::Message for EchoRequest {
    fn encode_raw(&self, buf: &mut impl bytes::BufMut)
    where
        Self: Sized,
    {
        if !self.text.is_empty() {
            prost::encoding::string::encode(1, &self.text, buf);
        }
    }

    fn merge_field(
        &mut self,
        tag: u32,
        wire_type: prost::encoding::WireType,
        buf: &mut impl bytes::Buf,
        ctx: prost::encoding::DecodeContext,
    ) -> Result<(), prost::DecodeError>
    where
        Self: Sized,
    {
        if tag == 1 {
            prost::encoding::string::merge(wire_type, &mut self.text, buf, ctx)
        } else {
            prost::encoding::skip_field(wire_type, tag, buf, ctx)
        }
    }

    fn encoded_len(&self) -> usize {
        if self.text.is_empty() {
            0
        } else {
            prost::encoding::string::encoded_len(1, &self.text)
        }
    }

    fn clear(&mut self) {
        self.text.clear();
    }
}

#[tokio::test]
async fn typed_stream_round_trip() {
    let requests = vec![
        EchoRequest { text: "one".into() },
        EchoRequest { text: "two".into() },
        EchoRequest { text: String::new() },
    ];

    let mut encoder = FrameEncoder::new(
        stream::iter(requests.clone()),
        ProstCodec::<EchoRequest>::new(),
    );

    // Collect the wire bytes, then feed them back byte by byte to force
    // reassembly.
    let mut wire = Vec::new();
    while let Some(frame) = encoder.next().await {
        wire.extend_from_slice(&frame.unwrap());
    }

    let chunks: Vec<Result<Bytes, WireError>> = wire
        .iter()
        .map(|b| Ok(Bytes::copy_from_slice(std::slice::from_ref(b))))
        .collect();
    let mut decoder = FrameDecoder::new(stream::iter(chunks), ProstCodec::<EchoRequest>::new());

    let mut decoded = Vec::new();
    while let Some(message) = decoder.next().await {
        decoded.push(message.unwrap());
    }
    assert_eq!(decoded, requests);
}

#[tokio::test]
async fn deadline_metadata_round_trip() {
    // The pieces a client assembles per request: a deadline header and a
    // binary metadata pair.
    let deadline = micros_to_interval(30_000_000).unwrap();
    assert_eq!(deadline, "30S");
    assert!(is_interval(&deadline));
    assert_eq!(interval_to_micros(&deadline).unwrap(), 30_000_000);

    let (key, wire_value) = encode_bin_value(
        "request-token",
        MetadataValue::Bin(Bytes::from_static(b"\x00\x99")),
    );
    assert_eq!(key, "request-token-bin");

    let (key, value) = decode_bin_value(&key, wire_value).unwrap();
    assert_eq!(key, "request-token");
    assert_eq!(value, MetadataValue::Bin(Bytes::from_static(b"\x00\x99")));
}
