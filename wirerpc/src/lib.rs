//! # wirerpc
//!
//! The framing and routing core of a gRPC-style RPC runtime. Typed method
//! calls travel over a multiplexed transport as length-prefixed message
//! frames; application metadata rides alongside as headers and trailers.
//! This crate owns the pieces between user-supplied message marshalling
//! and that transport:
//!
//! - **Framing**: one-shot encode/decode of `[flags][length][payload]`
//!   records (re-exported from [`wirerpc_core`]), plus the [`stream`]
//!   adapters that handle fragmentation and tail flushing on live byte
//!   streams.
//! - **Metadata**: the [`metadata`] `-bin` key convention for binary
//!   header values, and the [`interval`] grammar that carries deadlines as
//!   compact `<digits><unit>` strings.
//! - **Routing**: the [`app`] registry mapping `/service/method` routes
//!   to marshalling callbacks and handlers, with a completeness check
//!   before serving.
//!
//! The transport itself (HTTP/2 streams, TLS, protobuf codegen) lives
//! elsewhere; handlers and codecs plug in as callbacks.

pub mod app;
pub mod interval;
pub mod metadata;
pub mod stream;

pub use wirerpc_core::{
    BoxError, Code, FRAME_HEADER_SIZE, IdentityCodec, MarshalFn, MessageCodec, ProstCodec,
    RouteCodec, UnmarshalFn, WireError, check_frame_flags, decode_message, encode_message,
    frame_flags, parse_frame_header, wrap_frame,
};

pub mod prelude {
    //! The most common types in one import.
    pub use crate::app::{HandlerFn, Method, RegistryError, RpcApp, Service};
    pub use crate::interval::{interval_to_micros, is_interval, micros_to_interval};
    pub use crate::metadata::{MetadataValue, decode_bin_value, encode_bin_value};
    pub use crate::stream::{FrameDecoder, FrameEncoder};
    pub use wirerpc_core::{Code, IdentityCodec, MessageCodec, RouteCodec, WireError};
}
