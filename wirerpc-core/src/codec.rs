//! Message marshalling.
//!
//! This module provides the [`MessageCodec`] trait for converting
//! application messages to and from payload bytes, and implementations:
//! - [`IdentityCodec`]: raw bytes in, raw bytes out
//! - [`RouteCodec`]: type-erased callback pair as stored in a route table
//! - [`ProstCodec`]: protobuf messages via prost

use std::marker::PhantomData;
use std::sync::Arc;

use bytes::Bytes;

use crate::error::{BoxError, WireError};

/// Conversion between an application message and its payload bytes.
///
/// A codec is consulted once per message: [`marshal`](MessageCodec::marshal)
/// on the send side before framing, [`unmarshal`](MessageCodec::unmarshal)
/// on the receive side after the frame is sliced out. Codecs hold no
/// per-message state and may be shared freely.
pub trait MessageCodec: Send + Sync + 'static {
    /// The application message type.
    type Message;

    /// Convert a message into payload bytes.
    fn marshal(&self, message: &Self::Message) -> Result<Bytes, WireError>;

    /// Convert payload bytes back into a message.
    fn unmarshal(&self, payload: Bytes) -> Result<Self::Message, WireError>;
}

/// Codec that passes payload bytes through untransformed.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityCodec;

impl MessageCodec for IdentityCodec {
    type Message = Bytes;

    fn marshal(&self, message: &Bytes) -> Result<Bytes, WireError> {
        Ok(message.clone())
    }

    fn unmarshal(&self, payload: Bytes) -> Result<Bytes, WireError> {
        Ok(payload)
    }
}

/// Type-erased marshal callback: application bytes to payload bytes.
pub type MarshalFn = Arc<dyn Fn(&[u8]) -> Result<Bytes, BoxError> + Send + Sync>;

/// Type-erased unmarshal callback: payload bytes to application bytes.
pub type UnmarshalFn = Arc<dyn Fn(Bytes) -> Result<Bytes, BoxError> + Send + Sync>;

/// Codec assembled from the optional callback pair a route declares.
///
/// Route tables store marshal and unmarshal independently and either may be
/// absent; an absent side passes bytes through untransformed, which is how
/// raw byte-in/byte-out routes are expressed.
#[derive(Clone, Default)]
pub struct RouteCodec {
    marshal: Option<MarshalFn>,
    unmarshal: Option<UnmarshalFn>,
}

impl RouteCodec {
    /// Create a codec from a route's callbacks.
    pub fn new(marshal: Option<MarshalFn>, unmarshal: Option<UnmarshalFn>) -> Self {
        Self { marshal, unmarshal }
    }

    /// Codec with neither callback; both directions pass through.
    pub fn passthrough() -> Self {
        Self::default()
    }

    /// Whether a marshal callback is present.
    pub fn has_marshal(&self) -> bool {
        self.marshal.is_some()
    }

    /// Whether an unmarshal callback is present.
    pub fn has_unmarshal(&self) -> bool {
        self.unmarshal.is_some()
    }
}

impl MessageCodec for RouteCodec {
    type Message = Bytes;

    fn marshal(&self, message: &Bytes) -> Result<Bytes, WireError> {
        match &self.marshal {
            Some(f) => f(message).map_err(WireError::marshal),
            None => Ok(message.clone()),
        }
    }

    fn unmarshal(&self, payload: Bytes) -> Result<Bytes, WireError> {
        match &self.unmarshal {
            Some(f) => f(payload).map_err(WireError::unmarshal),
            None => Ok(payload),
        }
    }
}

impl std::fmt::Debug for RouteCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteCodec")
            .field("marshal", &self.marshal.is_some())
            .field("unmarshal", &self.unmarshal.is_some())
            .finish()
    }
}

/// Protobuf codec backed by prost.
pub struct ProstCodec<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> ProstCodec<T> {
    /// Create a new protobuf codec for `T`.
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for ProstCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for ProstCodec<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for ProstCodec<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProstCodec").finish()
    }
}

impl<T> MessageCodec for ProstCodec<T>
where
    T: prost::Message + Default + 'static,
{
    type Message = T;

    fn marshal(&self, message: &T) -> Result<Bytes, WireError> {
        Ok(Bytes::from(message.encode_to_vec()))
    }

    fn unmarshal(&self, payload: Bytes) -> Result<T, WireError> {
        T::decode(payload)
            .map_err(|e| WireError::Unmarshal(format!("protobuf decoding failed: {}", e)))
    }
}
