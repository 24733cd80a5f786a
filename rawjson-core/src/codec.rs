//! Outbound encoding of message values
//!
//! The inbound side tolerates bare arrays and bare objects; the outbound
//! side does not mirror that. An array-tolerant message is always written in
//! its canonical wrapped shape, `{"items": [...]}`, which the decoder reads
//! back through its pass-through branch.
//!
//! # Encoders
//!
//! - [`JsonEncoder`]: `application/json`, compact or indented
//! - [`TextEncoder`]: `text/plain`, for [`RawText`](crate::RawText) replies
//!   to devices. A JSON string, or an object with a non-empty string `body`,
//!   is written verbatim; anything else as compact JSON text.
//!
//! # Examples
//!
//! ```rust
//! use rawjson_core::codec::{self, JsonEncoder, TextEncoder};
//! use rawjson_core::RawText;
//!
//! let json = codec::encode(&JsonEncoder::new(), &serde_json::json!({"items": [1, 2]})).unwrap();
//! assert_eq!(&json[..], br#"{"items":[1,2]}"#);
//!
//! let text = codec::encode(&TextEncoder, &RawText::new("reboot")).unwrap();
//! assert_eq!(&text[..], b"reboot");
//! ```

use crate::error::EncodeError;
use bytes::Bytes;
use serde::Serialize;
use serde_json::Value;
use std::any::type_name;

/// Content type of raw JSON payloads
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Content type used by MassTransit-style senders for the same payloads
pub const MASSTRANSIT_JSON_CONTENT_TYPE: &str = "application/vnd.masstransit+json";

/// Content type of plain-text payloads
pub const TEXT_CONTENT_TYPE: &str = "text/plain";

/// Writes a JSON value as wire bytes under one content type
pub trait MessageEncoder: Send + Sync {
    /// Content type attached to the encoded bytes
    fn content_type(&self) -> &str;

    /// Encode an already-serialized value
    fn encode_value(&self, value: &Value) -> Result<Bytes, EncodeError>;
}

/// Serialize any value into a JSON tree
///
/// # Errors
///
/// `EncodeError::Serialize` when the value has no JSON representation
/// (for example a map with non-string keys).
pub fn to_tree<T: Serialize + ?Sized>(value: &T) -> Result<Value, EncodeError> {
    serde_json::to_value(value).map_err(|e| EncodeError::Serialize {
        target: type_name::<T>().to_string(),
        reason: e.to_string(),
    })
}

/// Encode a value with the given encoder
pub fn encode<T: Serialize + ?Sized>(
    encoder: &dyn MessageEncoder,
    value: &T,
) -> Result<Bytes, EncodeError> {
    let tree = to_tree(value)?;
    encoder.encode_value(&tree)
}

/// Encode a value for a content type
///
/// JSON content types (including the MassTransit one) get a compact
/// [`JsonEncoder`]; `text/plain` gets [`TextEncoder`].
///
/// # Errors
///
/// `EncodeError::UnsupportedContentType` for any other content type.
pub fn encode_as<T: Serialize + ?Sized>(value: &T, content_type: &str) -> Result<Bytes, EncodeError> {
    let encoder = encoder_for(content_type)?;
    encode(encoder.as_ref(), value)
}

/// Pick the built-in encoder for a content type
pub fn encoder_for(content_type: &str) -> Result<Box<dyn MessageEncoder>, EncodeError> {
    let media_type = media_type(content_type);
    match media_type.as_str() {
        JSON_CONTENT_TYPE | MASSTRANSIT_JSON_CONTENT_TYPE => {
            Ok(Box::new(JsonEncoder::new().with_content_type(media_type)))
        }
        TEXT_CONTENT_TYPE => Ok(Box::new(TextEncoder)),
        _ => Err(EncodeError::UnsupportedContentType(content_type.to_string())),
    }
}

/// Normalize a content type to its bare, lower-case media type
///
/// `"Application/JSON; charset=utf-8"` becomes `"application/json"`.
pub fn media_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// JSON encoder
#[derive(Debug, Clone)]
pub struct JsonEncoder {
    content_type: String,
    pretty: bool,
}

impl JsonEncoder {
    /// Compact `application/json` encoder
    pub fn new() -> Self {
        Self {
            content_type: JSON_CONTENT_TYPE.to_string(),
            pretty: false,
        }
    }

    /// Indented output
    pub fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    /// Override the content type attached to the output
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }
}

impl Default for JsonEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageEncoder for JsonEncoder {
    fn content_type(&self) -> &str {
        &self.content_type
    }

    fn encode_value(&self, value: &Value) -> Result<Bytes, EncodeError> {
        let encoded = if self.pretty {
            serde_json::to_vec_pretty(value)
        } else {
            serde_json::to_vec(value)
        };

        encoded.map(Bytes::from).map_err(|e| EncodeError::Serialize {
            target: "serde_json::Value".to_string(),
            reason: e.to_string(),
        })
    }
}

/// Plain-text encoder
#[derive(Debug, Clone, Copy, Default)]
pub struct TextEncoder;

impl MessageEncoder for TextEncoder {
    fn content_type(&self) -> &str {
        TEXT_CONTENT_TYPE
    }

    fn encode_value(&self, value: &Value) -> Result<Bytes, EncodeError> {
        let text = match value {
            Value::String(text) => text.clone(),
            Value::Object(map) => match map.get("body").and_then(Value::as_str) {
                Some(body) if !body.is_empty() => body.to_string(),
                _ => value.to_string(),
            },
            other => other.to_string(),
        };
        Ok(Bytes::from(text))
    }
}
