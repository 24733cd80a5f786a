//! Immutable JSON tree parsed once per inbound payload
//!
//! Every message type requested from an envelope is decoded from the same
//! `JsonTree`, so the raw bytes are only ever parsed once. The tree is shared
//! behind an `Arc` and never mutated after construction.
//!
//! # Empty Payloads
//!
//! An empty (or whitespace-only) payload and a literal `null` body both parse
//! to the empty object. Array-tolerant types decode that as an empty
//! collection; ordinary types see it as an object with every field missing.
//!
//! # Examples
//!
//! ```rust
//! use rawjson_core::{JsonShape, JsonTree};
//!
//! let tree = JsonTree::parse(br#"[{"mac":"AA:BB"}]"#).unwrap();
//! assert_eq!(tree.shape(), JsonShape::Array);
//!
//! let empty = JsonTree::parse(b"").unwrap();
//! assert!(empty.is_empty_document());
//! ```

use crate::error::ParseError;
use serde_json::{Map, Value};
use std::sync::Arc;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Coarse shape of a JSON node
///
/// The array-tolerant decoder branches on this, and `DecodeError::Malformed`
/// records it so callers can tell a scalar failure from an object failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JsonShape {
    /// A JSON object
    Object,
    /// A JSON array
    Array,
    /// A string, number or boolean
    Scalar,
    /// JSON `null`
    Null,
}

impl JsonShape {
    /// Shape of a `serde_json::Value`
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Object(_) => JsonShape::Object,
            Value::Array(_) => JsonShape::Array,
            Value::Null => JsonShape::Null,
            Value::Bool(_) | Value::Number(_) | Value::String(_) => JsonShape::Scalar,
        }
    }

    /// Lower-case name used in logs and error messages
    pub fn as_str(&self) -> &'static str {
        match self {
            JsonShape::Object => "object",
            JsonShape::Array => "array",
            JsonShape::Scalar => "scalar",
            JsonShape::Null => "null",
        }
    }
}

impl std::fmt::Display for JsonShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An already-parsed, immutable JSON document
///
/// Cloning is cheap: clones share the same parsed root.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonTree {
    root: Arc<Value>,
}

impl JsonTree {
    /// Parse a raw payload
    ///
    /// A leading UTF-8 byte-order mark is skipped. Empty input and `null`
    /// both yield the empty object.
    ///
    /// # Errors
    ///
    /// Returns `ParseError::Syntax` if the bytes are not well-formed JSON
    /// (including invalid UTF-8).
    pub fn parse(payload: &[u8]) -> Result<Self, ParseError> {
        let payload = payload.strip_prefix(UTF8_BOM).unwrap_or(payload);

        if payload.iter().all(u8::is_ascii_whitespace) {
            tracing::trace!("empty payload parsed as empty object");
            return Ok(Self::empty());
        }

        let value: Value = serde_json::from_slice(payload).map_err(ParseError::from)?;
        Ok(Self::from_value(value))
    }

    /// Parse a text payload
    pub fn parse_str(payload: &str) -> Result<Self, ParseError> {
        Self::parse(payload.as_bytes())
    }

    /// The empty-object document
    pub fn empty() -> Self {
        Self {
            root: Arc::new(Value::Object(Map::new())),
        }
    }

    /// Wrap an existing value; `null` becomes the empty object
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Null => Self::empty(),
            value => Self {
                root: Arc::new(value),
            },
        }
    }

    /// Borrow the root value
    pub fn as_value(&self) -> &Value {
        &self.root
    }

    /// Shape of the root node
    pub fn shape(&self) -> JsonShape {
        JsonShape::of(&self.root)
    }

    /// True for the empty object (what empty payloads parse to)
    pub fn is_empty_document(&self) -> bool {
        match self.root.as_ref() {
            Value::Object(map) => map.is_empty(),
            Value::Null => true,
            _ => false,
        }
    }
}

impl Default for JsonTree {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<Value> for JsonTree {
    fn from(value: Value) -> Self {
        Self::from_value(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_object_and_array() {
        let tree = JsonTree::parse(br#"{"mac":"AA:BB"}"#).unwrap();
        assert_eq!(tree.shape(), JsonShape::Object);
        assert_eq!(tree.as_value()["mac"], "AA:BB");

        let tree = JsonTree::parse(br#"[{"mac":"AA:BB"},{"mac":"CC:DD"}]"#).unwrap();
        assert_eq!(tree.shape(), JsonShape::Array);
        assert_eq!(tree.as_value().as_array().map(Vec::len), Some(2));
    }

    #[test]
    fn test_empty_payload_is_empty_object() {
        for payload in [&b""[..], b"   ", b"\n\t", b"null", b" null "] {
            let tree = JsonTree::parse(payload).unwrap();
            assert_eq!(tree.as_value(), &json!({}));
            assert!(tree.is_empty_document());
        }
    }

    #[test]
    fn test_bom_is_skipped() {
        let mut payload = UTF8_BOM.to_vec();
        payload.extend_from_slice(br#"{"a":1}"#);

        let tree = JsonTree::parse(&payload).unwrap();
        assert_eq!(tree.as_value(), &json!({"a": 1}));
    }

    #[test]
    fn test_invalid_json() {
        let result = JsonTree::parse(b"not valid json{");
        assert!(matches!(result, Err(ParseError::Syntax { line: 1, .. })));

        let result = JsonTree::parse(&[b'"', 0xff, b'"']);
        assert!(result.is_err());
    }

    #[test]
    fn test_scalar_shapes() {
        assert_eq!(JsonTree::parse_str("42").unwrap().shape(), JsonShape::Scalar);
        assert_eq!(JsonTree::parse_str("\"x\"").unwrap().shape(), JsonShape::Scalar);
        assert_eq!(JsonTree::parse_str("true").unwrap().shape(), JsonShape::Scalar);
        assert!(!JsonTree::parse_str("0").unwrap().is_empty_document());
    }

    #[test]
    fn test_clones_share_root() {
        let tree = JsonTree::from(json!([1, 2, 3]));
        let clone = tree.clone();
        assert!(std::ptr::eq(tree.as_value(), clone.as_value()));
    }
}
