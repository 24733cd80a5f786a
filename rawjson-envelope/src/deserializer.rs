//! Inbound deserializers
//!
//! A deserializer turns an [`InboundMessage`] into an [`Envelope`]: it checks
//! the charset, parses the payload once and reads the sender's message type
//! declaration and message id from the headers. The
//! [`DeserializerRegistry`] picks a deserializer by content type.
//!
//! # Content types
//!
//! Matching uses the bare media type, lower-cased; parameters such as
//! `; charset=utf-8` are ignored. A message without a content type is read
//! as `application/json`.
//!
//! # Examples
//!
//! ```rust
//! use rawjson_envelope::{DeserializerRegistry, InboundMessage, RawOptions};
//!
//! let registry = DeserializerRegistry::with_defaults(RawOptions::default());
//! let message = InboundMessage::new(r#"[{"mac":"AA"}]"#)
//!     .with_content_type("application/json; charset=utf-8");
//!
//! let envelope = registry.deserialize(&message).unwrap();
//! assert!(envelope.json().is_array());
//! ```

use crate::envelope::Envelope;
use crate::inbound::InboundMessage;
use crate::options::RawOptions;
use rawjson_core::codec::{media_type, JSON_CONTENT_TYPE, MASSTRANSIT_JSON_CONTENT_TYPE};
use rawjson_core::{Acceptance, JsonTree, ParseError};
use std::collections::HashMap;
use std::sync::Arc;

/// Turns received bytes into an envelope
pub trait MessageDeserializer: Send + Sync {
    /// Content type this deserializer handles
    fn content_type(&self) -> &str;

    /// Parse the message into an envelope
    ///
    /// # Errors
    ///
    /// A `ParseError` means no message type can be decoded from the message.
    fn deserialize(&self, message: &InboundMessage) -> Result<Envelope, ParseError>;
}

/// Deserializer for raw (un-enveloped) JSON payloads
#[derive(Debug, Clone)]
pub struct RawJsonDeserializer {
    content_type: String,
    options: RawOptions,
}

impl RawJsonDeserializer {
    /// Deserializer for `application/json`
    pub fn new(options: RawOptions) -> Self {
        Self::for_content_type(JSON_CONTENT_TYPE, options)
    }

    /// Deserializer registered under another content type
    pub fn for_content_type(content_type: &str, options: RawOptions) -> Self {
        Self {
            content_type: media_type(content_type),
            options,
        }
    }

    /// Options this deserializer applies
    pub fn options(&self) -> RawOptions {
        self.options
    }
}

impl MessageDeserializer for RawJsonDeserializer {
    fn content_type(&self) -> &str {
        &self.content_type
    }

    fn deserialize(&self, message: &InboundMessage) -> Result<Envelope, ParseError> {
        check_encoding(message)?;

        let tree = JsonTree::parse(&message.payload).map_err(|error| {
            tracing::warn!(
                message_id = message.headers.message_id(),
                content_type = %self.content_type,
                error = %error,
                "payload is not valid JSON"
            );
            error
        })?;

        let acceptance = Acceptance::declared(message.headers.message_types())
            .with_any_message_type(self.options.any_message_type);

        tracing::trace!(
            message_id = message.headers.message_id(),
            shape = %tree.shape(),
            bytes = message.payload.len(),
            "payload parsed"
        );

        Ok(Envelope::new(tree, acceptance)
            .with_headers(message.headers.clone())
            .with_content_type(self.content_type.clone()))
    }
}

/// Only UTF-8 payloads are accepted
fn check_encoding(message: &InboundMessage) -> Result<(), ParseError> {
    match message.headers.content_encoding() {
        None => Ok(()),
        Some(encoding)
            if encoding.eq_ignore_ascii_case("utf-8") || encoding.eq_ignore_ascii_case("utf8") =>
        {
            Ok(())
        }
        Some(encoding) => Err(ParseError::UnsupportedEncoding(encoding.to_string())),
    }
}

/// Content-type keyed set of deserializers
///
/// Cheap to clone; registrations are shared until the clone is modified.
#[derive(Clone, Default)]
pub struct DeserializerRegistry {
    deserializers: Arc<HashMap<String, Arc<dyn MessageDeserializer>>>,
}

impl DeserializerRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with raw JSON deserializers for `application/json` and
    /// `application/vnd.masstransit+json`
    pub fn with_defaults(options: RawOptions) -> Self {
        let mut registry = Self::new();
        registry.register(RawJsonDeserializer::new(options));
        registry.register(RawJsonDeserializer::for_content_type(
            MASSTRANSIT_JSON_CONTENT_TYPE,
            options,
        ));
        registry
    }

    /// Register a deserializer, replacing any for the same content type
    pub fn register(&mut self, deserializer: impl MessageDeserializer + 'static) {
        let content_type = media_type(deserializer.content_type());
        Arc::make_mut(&mut self.deserializers).insert(content_type, Arc::new(deserializer));
    }

    /// Remove every registration
    pub fn clear(&mut self) {
        Arc::make_mut(&mut self.deserializers).clear();
    }

    /// Registered content types
    pub fn content_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.deserializers.keys().cloned().collect();
        types.sort();
        types
    }

    /// Find the deserializer for a content type
    ///
    /// # Errors
    ///
    /// `ParseError::UnsupportedContentType` when nothing is registered for it.
    pub fn resolve(
        &self,
        content_type: Option<&str>,
    ) -> Result<Arc<dyn MessageDeserializer>, ParseError> {
        let requested = content_type.unwrap_or(JSON_CONTENT_TYPE);
        self.deserializers
            .get(&media_type(requested))
            .cloned()
            .ok_or_else(|| ParseError::UnsupportedContentType(requested.to_string()))
    }

    /// Deserialize a message with the deserializer for its content type
    pub fn deserialize(&self, message: &InboundMessage) -> Result<Envelope, ParseError> {
        self.resolve(message.effective_content_type())?
            .deserialize(message)
    }
}

impl std::fmt::Debug for DeserializerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeserializerRegistry")
            .field("content_types", &self.content_types())
            .finish()
    }
}
