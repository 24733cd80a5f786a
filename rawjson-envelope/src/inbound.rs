//! Inbound transport boundary
//!
//! The transport (broker consumer, socket reader, ...) hands each received
//! message over as an [`InboundMessage`]. How it arrived is not this crate's
//! concern.

use crate::headers::Headers;
use bytes::Bytes;

/// One received message, as handed over by the transport
#[derive(Debug, Clone, Default)]
pub struct InboundMessage {
    /// Raw payload bytes
    pub payload: Bytes,
    /// Content type reported by the transport, if any
    pub content_type: Option<String>,
    /// Transport headers
    pub headers: Headers,
}

impl InboundMessage {
    /// Create a message from a payload
    pub fn new(payload: impl Into<Bytes>) -> Self {
        Self {
            payload: payload.into(),
            content_type: None,
            headers: Headers::new(),
        }
    }

    /// Set the content type
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Add a transport header
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Replace all transport headers
    pub fn with_headers(mut self, headers: Headers) -> Self {
        self.headers = headers;
        self
    }

    /// Content type from the transport, falling back to the `Content-Type` header
    pub fn effective_content_type(&self) -> Option<&str> {
        self.content_type
            .as_deref()
            .or_else(|| self.headers.content_type())
    }
}
