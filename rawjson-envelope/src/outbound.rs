//! Outbound encoding
//!
//! [`OutboundEncoder`] turns a message value into an [`OutboundMessage`]
//! ready for the transport: encoded bytes, the content type and headers.
//!
//! # Examples
//!
//! ```rust
//! use rawjson_core::RawText;
//! use rawjson_envelope::OutboundEncoder;
//!
//! let reply = OutboundEncoder::text().encode_message(&RawText::new("OK")).unwrap();
//! assert_eq!(&reply.body[..], b"OK");
//! assert_eq!(reply.content_type, "text/plain");
//! ```

use crate::headers::{Headers, CONTENT_TYPE, MESSAGE_TYPE};
use crate::metrics::EnvelopeMetrics;
use crate::options::RawOptions;
use bytes::Bytes;
use rawjson_core::codec::{self, encoder_for};
use rawjson_core::{EncodeError, JsonEncoder, MessageEncoder, MessageType, TextEncoder};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// An encoded message, ready to hand to the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    /// Encoded payload
    pub body: Bytes,
    /// Content type of `body`
    pub content_type: String,
    /// Headers to send with the payload
    pub headers: Headers,
}

/// Encodes outbound messages with one [`MessageEncoder`]
#[derive(Clone)]
pub struct OutboundEncoder {
    encoder: Arc<dyn MessageEncoder>,
    options: RawOptions,
    metrics: Option<Arc<EnvelopeMetrics>>,
}

impl OutboundEncoder {
    /// Wrap any encoder
    pub fn new(encoder: impl MessageEncoder + 'static) -> Self {
        Self {
            encoder: Arc::new(encoder),
            options: RawOptions::default(),
            metrics: None,
        }
    }

    /// Compact `application/json`
    pub fn json() -> Self {
        Self::new(JsonEncoder::new())
    }

    /// `text/plain`, for device replies
    pub fn text() -> Self {
        Self::new(TextEncoder)
    }

    /// Built-in encoder for a content type
    ///
    /// # Errors
    ///
    /// `EncodeError::UnsupportedContentType` for anything but the JSON and
    /// text content types.
    pub fn for_content_type(content_type: &str) -> Result<Self, EncodeError> {
        Ok(Self {
            encoder: Arc::from(encoder_for(content_type)?),
            options: RawOptions::default(),
            metrics: None,
        })
    }

    /// Apply serializer options
    pub fn with_options(mut self, options: RawOptions) -> Self {
        self.options = options;
        self
    }

    /// Count every encoded message on `metrics`
    pub fn with_metrics(mut self, metrics: Arc<EnvelopeMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// A `text/plain` encoder with the same options and metrics
    pub fn to_text(&self) -> Self {
        Self {
            encoder: Arc::new(TextEncoder),
            options: self.options,
            metrics: self.metrics.clone(),
        }
    }

    /// Content type of everything this encoder writes
    pub fn content_type(&self) -> &str {
        self.encoder.content_type()
    }

    /// Encode a message
    ///
    /// Stamps `Content-Type`, and `MessageType` when transport headers are
    /// enabled.
    ///
    /// # Errors
    ///
    /// `EncodeError::Serialize` when the value has no JSON representation.
    pub fn encode_message<T: MessageType + Serialize>(
        &self,
        message: &T,
    ) -> Result<OutboundMessage, EncodeError> {
        let body = codec::encode(self.encoder.as_ref(), message)?;
        let urn = self.options.add_transport_headers.then(T::message_urn);
        Ok(self.finish(body, urn))
    }

    /// Encode an untyped JSON value
    ///
    /// No `MessageType` header is stamped since the value has no type identity.
    pub fn encode_value(&self, value: &Value) -> Result<OutboundMessage, EncodeError> {
        let body = self.encoder.encode_value(value)?;
        Ok(self.finish(body, None))
    }

    fn finish(&self, body: Bytes, urn: Option<String>) -> OutboundMessage {
        let content_type = self.encoder.content_type().to_string();
        let mut headers = Headers::new().with(CONTENT_TYPE, content_type.clone());
        if let Some(urn) = urn {
            headers.insert(MESSAGE_TYPE, urn);
        }

        tracing::trace!(
            content_type = %content_type,
            bytes = body.len(),
            "message encoded"
        );

        if let Some(metrics) = &self.metrics {
            metrics.record_encoded(&content_type);
        }

        OutboundMessage {
            body,
            content_type,
            headers,
        }
    }
}

impl Default for OutboundEncoder {
    fn default() -> Self {
        Self::json()
    }
}

impl std::fmt::Debug for OutboundEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutboundEncoder")
            .field("content_type", &self.content_type())
            .field("options", &self.options)
            .field("metrics", &self.metrics.is_some())
            .finish()
    }
}
