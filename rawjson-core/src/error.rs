//! Error types for rawjson
//!
//! Failures are split by how far they reach:
//!
//! - **ParseError**: the payload is not JSON at all. Fatal for the whole
//!   envelope; no message type can be decoded from it.
//! - **DecodeError**: the payload is JSON but does not fit one requested
//!   message type (`Malformed`), or the acceptance filter ruled the type out
//!   before decoding (`Unsupported`). Scoped to that one type; other types in
//!   the same envelope are unaffected.
//! - **EncodeError**: an outbound value could not be written. Fatal to that
//!   one publish attempt only.
//!
//! `Error` wraps all of them for code that wants a single error type.
//! Every error is `Clone` because a cached decode failure is handed to each
//! consumer that asks for the same type.
//!
//! # Examples
//!
//! ```rust
//! use rawjson_core::{DecodeError, Error};
//!
//! let error = DecodeError::unsupported("urn:message:devices:Widget");
//! assert!(error.is_unsupported());
//!
//! let wrapped: Error = error.into();
//! assert!(wrapped.to_string().contains("Widget"));
//! ```

use crate::value::JsonShape;
use thiserror::Error;

/// Result type for rawjson operations
pub type Result<T> = std::result::Result<T, Error>;

/// Crate-level error covering every rawjson failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The inbound payload could not be interpreted as JSON
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// The inbound payload did not fit a requested message type
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// An outbound value could not be encoded
    #[error("Encode error: {0}")]
    Encode(#[from] EncodeError),

    /// A consumer failed while handling a decoded message
    ///
    /// Returned by business-logic consumers; the dispatcher reports it for
    /// that consumer without affecting the others.
    #[error("Consumer error: {0}")]
    Consumer(String),
}

/// The payload cannot be interpreted as JSON
///
/// Raised once per envelope, before any message type is attempted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The bytes are not well-formed JSON
    #[error("invalid JSON at line {line}, column {column}: {reason}")]
    Syntax {
        /// One-based line of the first offending byte
        line: usize,
        /// One-based column of the first offending byte
        column: usize,
        /// Parser description of the problem
        reason: String,
    },

    /// The `Content-Encoding` header names a charset other than UTF-8
    #[error("unsupported content encoding: {0}")]
    UnsupportedEncoding(String),

    /// No deserializer is registered for the message's content type
    #[error("unsupported content type: {0}")]
    UnsupportedContentType(String),
}

impl From<serde_json::Error> for ParseError {
    fn from(err: serde_json::Error) -> Self {
        ParseError::Syntax {
            line: err.line(),
            column: err.column(),
            reason: err.to_string(),
        }
    }
}

/// One element of a JSON array that failed to decode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemError {
    /// Zero-based position of the element in the payload array
    pub index: usize,
    /// Why the element did not decode
    pub reason: String,
}

impl std::fmt::Display for ItemError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.index, self.reason)
    }
}

/// A message type could not be produced from the envelope
///
/// This is a normal negative result, not an exceptional condition: the
/// envelope may still decode as another type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The JSON does not fit the requested type
    #[error("{target} cannot be decoded from a JSON {shape}: {reason}")]
    Malformed {
        /// Canonical identifier of the requested type
        target: String,
        /// Shape of the JSON tree that was offered
        shape: JsonShape,
        /// Summary of the failure
        reason: String,
        /// Per-element failures when the payload was an array, in array order
        items: Vec<ItemError>,
    },

    /// The acceptance declaration excludes the requested type
    #[error("unsupported type: {target}")]
    Unsupported {
        /// Canonical identifier of the requested type
        target: String,
    },

    /// A decode cache slot held a value of another type
    ///
    /// Slots are keyed by type identity, so this signals a bug in the cache
    /// rather than anything about the payload.
    #[error("decode cache slot for {target} holds a different type")]
    CacheMismatch {
        /// Rust type name of the requested type
        target: String,
    },
}

impl DecodeError {
    /// Create a `Malformed` error without element details
    pub fn malformed(target: impl Into<String>, shape: JsonShape, reason: impl Into<String>) -> Self {
        DecodeError::Malformed {
            target: target.into(),
            shape,
            reason: reason.into(),
            items: Vec::new(),
        }
    }

    /// Create an `Unsupported` error
    pub fn unsupported(target: impl Into<String>) -> Self {
        DecodeError::Unsupported {
            target: target.into(),
        }
    }

    /// Create a `CacheMismatch` error
    pub fn cache_mismatch(target: impl Into<String>) -> Self {
        DecodeError::CacheMismatch {
            target: target.into(),
        }
    }

    /// Canonical identifier of the type that failed
    pub fn target(&self) -> &str {
        match self {
            DecodeError::Malformed { target, .. }
            | DecodeError::Unsupported { target }
            | DecodeError::CacheMismatch { target } => target,
        }
    }

    /// Short label used in logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            DecodeError::Malformed { .. } => "malformed",
            DecodeError::Unsupported { .. } => "rejected",
            DecodeError::CacheMismatch { .. } => "cache_mismatch",
        }
    }

    /// True when the acceptance filter rejected the type
    pub fn is_unsupported(&self) -> bool {
        matches!(self, DecodeError::Unsupported { .. })
    }

    /// True when the JSON did not fit the type
    pub fn is_malformed(&self) -> bool {
        matches!(self, DecodeError::Malformed { .. })
    }

    /// Shape of the offending JSON, if the decoder looked at it
    pub fn shape(&self) -> Option<JsonShape> {
        match self {
            DecodeError::Malformed { shape, .. } => Some(*shape),
            DecodeError::Unsupported { .. } | DecodeError::CacheMismatch { .. } => None,
        }
    }

    /// Per-element failures from an array payload
    pub fn item_errors(&self) -> &[ItemError] {
        match self {
            DecodeError::Malformed { items, .. } => items,
            DecodeError::Unsupported { .. } | DecodeError::CacheMismatch { .. } => &[],
        }
    }
}

/// An outbound value could not be encoded
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    /// The value cannot be represented as JSON
    #[error("cannot serialize {target}: {reason}")]
    Serialize {
        /// Type name of the value being encoded
        target: String,
        /// Serializer description of the problem
        reason: String,
    },

    /// No encoder exists for the requested content type
    #[error("unsupported content type: {0}")]
    UnsupportedContentType(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_from_serde() {
        let serde_error = serde_json::from_str::<serde_json::Value>("{\n  \"mac\": ").unwrap_err();
        let error = ParseError::from(serde_error);

        match error {
            ParseError::Syntax { line, reason, .. } => {
                assert_eq!(line, 2);
                assert!(!reason.is_empty());
            }
            _ => panic!("Expected Syntax error"),
        }
    }

    #[test]
    fn test_decode_error_accessors() {
        let error = DecodeError::malformed("urn:message:Widget", JsonShape::Scalar, "expected struct");
        assert!(error.is_malformed());
        assert!(!error.is_unsupported());
        assert_eq!(error.target(), "urn:message:Widget");
        assert_eq!(error.shape(), Some(JsonShape::Scalar));
        assert!(error.item_errors().is_empty());

        let error = DecodeError::unsupported("urn:message:Gadget");
        assert!(error.is_unsupported());
        assert_eq!(error.shape(), None);
        assert_eq!(error.kind(), "rejected");

        let error = DecodeError::cache_mismatch("devices::Widget");
        assert!(!error.is_malformed() && !error.is_unsupported());
        assert_eq!(error.target(), "devices::Widget");
        assert_eq!(error.shape(), None);
        assert_eq!(error.to_string(), "decode cache slot for devices::Widget holds a different type");
    }

    #[test]
    fn test_decode_error_display() {
        let error = DecodeError::malformed("urn:message:Widget", JsonShape::Array, "2 of 3 items failed");
        let display = error.to_string();

        assert!(display.contains("urn:message:Widget"));
        assert!(display.contains("array"));
        assert!(display.contains("2 of 3 items failed"));

        assert_eq!(
            DecodeError::unsupported("Gadget").to_string(),
            "unsupported type: Gadget"
        );
    }

    #[test]
    fn test_item_error_display() {
        let item = ItemError {
            index: 4,
            reason: "missing field `mac`".to_string(),
        };
        assert_eq!(item.to_string(), "[4] missing field `mac`");
    }

    #[test]
    fn test_error_conversions() {
        let parse: Error = ParseError::UnsupportedEncoding("utf-16".into()).into();
        assert!(matches!(parse, Error::Parse(_)));

        let encode: Error = EncodeError::UnsupportedContentType("application/xml".into()).into();
        assert!(encode.to_string().contains("application/xml"));

        let consumer = Error::Consumer("device offline".into());
        assert_eq!(consumer.to_string(), "Consumer error: device offline");
    }
}
