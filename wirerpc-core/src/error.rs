//! Wire-level error types.
//!
//! This module provides the error types shared by the frame codec, the
//! streaming codecs, and the metadata codecs:
//! - [`Code`]: RPC status codes
//! - [`WireError`]: codec and framing error type
//! - [`BoxError`]: the error form produced by user marshalling callbacks

/// Boxed error returned by user-supplied marshal and unmarshal callbacks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// RPC status codes surfaced by this layer.
///
/// The wider gRPC code space belongs to the transport; this is the subset
/// the codecs and the route table report, with the canonical numbering
/// kept so the values stay meaningful on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Code {
    /// Malformed wire input.
    InvalidArgument = 3,
    /// A value outside its representable range.
    OutOfRange = 11,
    /// A route with no registered handler.
    Unimplemented = 12,
    /// A failed marshal or unmarshal callback.
    Internal = 13,
    /// A byte stream cut off inside a frame.
    DataLoss = 15,
}

impl Code {
    /// Get the string representation of this code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Code::InvalidArgument => "invalid_argument",
            Code::OutOfRange => "out_of_range",
            Code::Unimplemented => "unimplemented",
            Code::Internal => "internal",
            Code::DataLoss => "data_loss",
        }
    }
}

impl std::fmt::Display for Code {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised by the wire codecs.
///
/// Marshal and unmarshal failures carry the callback's own message
/// verbatim. Every variant maps onto a [`Code`] via [`WireError::code`].
#[derive(Clone, Debug, thiserror::Error)]
pub enum WireError {
    /// A value fell outside its representable range: a buffer shorter than
    /// a frame header, a length field disagreeing with the payload, or an
    /// interval that cannot be expressed in the wire grammar.
    #[error("out of range: {0}")]
    OutOfRange(String),

    /// A marshal callback failed.
    #[error("marshal failed: {0}")]
    Marshal(String),

    /// An unmarshal callback failed.
    #[error("unmarshal failed: {0}")]
    Unmarshal(String),

    /// A byte stream ended inside a frame.
    #[error("framing error: {0}")]
    Framing(String),

    /// Malformed wire input: unknown frame flags, invalid base64 metadata.
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl WireError {
    /// The status code a transport should report for this error.
    ///
    /// - OutOfRange: `OutOfRange`
    /// - Marshal/Unmarshal: `Internal`
    /// - Framing: `DataLoss`
    /// - Protocol: `InvalidArgument`
    pub fn code(&self) -> Code {
        match self {
            WireError::OutOfRange(_) => Code::OutOfRange,
            WireError::Marshal(_) | WireError::Unmarshal(_) => Code::Internal,
            WireError::Framing(_) => Code::DataLoss,
            WireError::Protocol(_) => Code::InvalidArgument,
        }
    }

    /// Wrap a failed marshal callback, carrying its message verbatim.
    pub fn marshal(err: BoxError) -> Self {
        WireError::Marshal(err.to_string())
    }

    /// Wrap a failed unmarshal callback, carrying its message verbatim.
    pub fn unmarshal(err: BoxError) -> Self {
        WireError::Unmarshal(err.to_string())
    }
}
