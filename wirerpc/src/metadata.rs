//! Metadata value encoding.
//!
//! Header blocks carry only ASCII on the wire. Binary values, and string
//! values with any codepoint outside 0x00-0x7F, are base64-encoded and
//! their key gains a `-bin` suffix; the receiving side recognizes the
//! suffix, strips it, and decodes the value back to bytes.
//!
//! Base64 is the standard alphabet with padding. Decoding also tolerates
//! unpadded input from lenient peers.

use base64::Engine;
use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD};
use bytes::Bytes;
use wirerpc_core::WireError;

/// Key suffix marking a base64-encoded binary value.
pub const BIN_SUFFIX: &str = "-bin";

/// A metadata value: a single string, a byte buffer, or a list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataValue {
    /// A single string value.
    Str(String),
    /// A binary value.
    Bin(Bytes),
    /// A list of string and binary elements.
    List(Vec<MetadataElem>),
}

/// One element of a list-valued metadata entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataElem {
    Str(String),
    Bin(Bytes),
}

impl MetadataElem {
    fn is_binary(&self) -> bool {
        match self {
            MetadataElem::Str(s) => !s.is_ascii(),
            MetadataElem::Bin(_) => true,
        }
    }

    fn to_base64(&self) -> String {
        match self {
            MetadataElem::Str(s) => STANDARD.encode(s.as_bytes()),
            MetadataElem::Bin(b) => STANDARD.encode(b),
        }
    }
}

/// Rewrite a metadata pair into its wire form.
///
/// Byte buffers and non-ASCII strings come back base64-encoded under
/// `key + "-bin"`. A list with any binary or non-ASCII element has every
/// element base64-encoded. ASCII input is returned unchanged.
///
/// The transformation is not idempotent on its own output: running it
/// again over a pair that already carries the suffix suffixes it twice.
/// Callers apply it once, on the application-side value.
///
/// # Example
///
/// ```
/// use bytes::Bytes;
/// use wirerpc::metadata::{MetadataValue, encode_bin_value};
///
/// let (key, value) = encode_bin_value("token", MetadataValue::Bin(Bytes::from_static(&[0, 1, 2])));
/// assert_eq!(key, "token-bin");
/// assert_eq!(value, MetadataValue::Str("AAEC".into()));
/// ```
pub fn encode_bin_value(key: &str, value: MetadataValue) -> (String, MetadataValue) {
    match value {
        MetadataValue::Bin(bytes) => (
            format!("{}{}", key, BIN_SUFFIX),
            MetadataValue::Str(STANDARD.encode(&bytes)),
        ),
        MetadataValue::Str(s) if !s.is_ascii() => (
            format!("{}{}", key, BIN_SUFFIX),
            MetadataValue::Str(STANDARD.encode(s.as_bytes())),
        ),
        MetadataValue::List(elems) if elems.iter().any(MetadataElem::is_binary) => {
            let encoded = elems
                .iter()
                .map(|e| MetadataElem::Str(e.to_base64()))
                .collect();
            (format!("{}{}", key, BIN_SUFFIX), MetadataValue::List(encoded))
        }
        other => (key.to_string(), other),
    }
}

/// Rewrite a wire pair back into its application form.
///
/// Keys without the `-bin` suffix pass through unchanged. Suffixed keys
/// are stripped and their values base64-decoded: a scalar string becomes a
/// buffer, a list of strings becomes a list of buffers. Malformed base64,
/// or a suffixed value that is not a wire string, is a protocol error.
pub fn decode_bin_value(
    key: &str,
    value: MetadataValue,
) -> Result<(String, MetadataValue), WireError> {
    let Some(stripped) = key.strip_suffix(BIN_SUFFIX) else {
        return Ok((key.to_string(), value));
    };

    let decoded = match value {
        MetadataValue::Str(s) => MetadataValue::Bin(decode_base64(key, &s)?),
        MetadataValue::List(elems) => {
            let mut buffers = Vec::with_capacity(elems.len());
            for elem in elems {
                match elem {
                    MetadataElem::Str(s) => {
                        buffers.push(MetadataElem::Bin(decode_base64(key, &s)?));
                    }
                    MetadataElem::Bin(_) => {
                        return Err(WireError::Protocol(format!(
                            "metadata key {:?} carries a non-string wire value",
                            key
                        )));
                    }
                }
            }
            MetadataValue::List(buffers)
        }
        MetadataValue::Bin(_) => {
            return Err(WireError::Protocol(format!(
                "metadata key {:?} carries a non-string wire value",
                key
            )));
        }
    };

    Ok((stripped.to_string(), decoded))
}

fn decode_base64(key: &str, value: &str) -> Result<Bytes, WireError> {
    STANDARD
        .decode(value)
        .or_else(|_| STANDARD_NO_PAD.decode(value))
        .map(Bytes::from)
        .map_err(|e| {
            WireError::Protocol(format!("invalid base64 in metadata key {:?}: {}", key, e))
        })
}
