//! Received-message context
//!
//! An [`Envelope`] is what a consumer sees for one received message: the
//! parsed JSON tree, the transport headers, the sender's acceptance
//! declaration and a decode cache. Consumers ask it for typed views with
//! [`Envelope::get_or_decode`]; each type is decoded at most once per
//! envelope and the outcome, good or bad, is kept for later callers.
//!
//! # Examples
//!
//! ```rust
//! use rawjson_core::{Acceptance, JsonTree, MessageType};
//! use rawjson_envelope::Envelope;
//! use serde::Deserialize;
//!
//! #[derive(Debug, Deserialize)]
//! struct Ping { seq: u32 }
//! impl MessageType for Ping {}
//!
//! let tree = JsonTree::parse(br#"{"seq": 4}"#).unwrap();
//! let envelope = Envelope::new(tree, Acceptance::default());
//!
//! let ping = envelope.get_or_decode::<Ping>().unwrap();
//! assert_eq!(ping.seq, 4);
//! assert!(envelope.has_message_type::<Ping>());
//! ```

use crate::cache::{DecodeAttempt, DecodeCache, EnvelopeStats};
use crate::headers::Headers;
use rawjson_core::codec::JSON_CONTENT_TYPE;
use rawjson_core::{decoder, Acceptance, DecodeError, JsonTree, MessageType, TargetDescriptor};
use serde_json::Value;
use std::sync::Arc;

/// One received message and its per-type decode cache
///
/// `Envelope` is `Send + Sync`; share it with `Arc` when several tasks
/// consume the same message.
#[derive(Debug)]
pub struct Envelope {
    tree: JsonTree,
    headers: Headers,
    content_type: String,
    message_id: Option<String>,
    acceptance: Acceptance,
    cache: DecodeCache,
}

impl Envelope {
    /// Create an envelope around an already parsed tree
    pub fn new(tree: JsonTree, acceptance: Acceptance) -> Self {
        Self {
            tree,
            headers: Headers::new(),
            content_type: JSON_CONTENT_TYPE.to_string(),
            message_id: None,
            acceptance,
            cache: DecodeCache::new(),
        }
    }

    /// Attach transport headers; the message id is read from them
    pub fn with_headers(mut self, headers: Headers) -> Self {
        self.message_id = headers.message_id().map(str::to_string);
        self.headers = headers;
        self
    }

    /// Record the content type the payload arrived with
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    /// Decode the payload as `T`, or return the outcome cached for `T`
    ///
    /// The acceptance filter runs first; a rejected type never reads the
    /// tree and yields `DecodeError::Unsupported`. The outcome is cached
    /// for the life of the envelope.
    ///
    /// # Errors
    ///
    /// - `DecodeError::Unsupported` when the sender's declaration rules `T` out
    /// - `DecodeError::Malformed` when the payload does not fit `T`
    pub fn get_or_decode<T: MessageType>(&self) -> Result<Arc<T>, DecodeError> {
        self.cache.get_or_insert_with(|| {
            let target = TargetDescriptor::of::<T>();

            if !self.acceptance.accepts(&target) {
                self.cache.stats().record_rejection();
                tracing::debug!(
                    message_id = self.message_id.as_deref(),
                    urn = target.urn(),
                    declared = ?self.acceptance.declared_types(),
                    "message type rejected by sender declaration"
                );
                return Err(DecodeError::unsupported(target.urn()));
            }

            self.cache.stats().record_decode();
            let result = decoder::decode::<T>(&self.tree);

            if let Err(error) = &result {
                tracing::debug!(
                    message_id = self.message_id.as_deref(),
                    urn = target.urn(),
                    error = %error,
                    "message type did not fit payload"
                );
            }

            result
        })
    }

    /// Cached outcome for `T`, without decoding
    pub fn try_get<T: MessageType>(&self) -> Option<Result<Arc<T>, DecodeError>> {
        self.cache.try_get::<T>()
    }

    /// State of `T` in this envelope, without decoding
    pub fn attempt<T: MessageType>(&self) -> DecodeAttempt<T> {
        self.cache.attempt::<T>()
    }

    /// True only if `T` has already been decoded successfully
    pub fn has_message_type<T: MessageType>(&self) -> bool {
        matches!(self.try_get::<T>(), Some(Ok(_)))
    }

    /// The message type URNs the sender declared
    ///
    /// Empty when the sender declared nothing, which means every type is
    /// accepted.
    pub fn supported_message_types(&self) -> &[String] {
        self.acceptance.declared_types()
    }

    /// The acceptance declaration for this envelope
    pub fn acceptance(&self) -> &Acceptance {
        &self.acceptance
    }

    /// The parsed payload
    pub fn tree(&self) -> &JsonTree {
        &self.tree
    }

    /// The parsed payload as a raw JSON value
    pub fn json(&self) -> &Value {
        self.tree.as_value()
    }

    /// Transport headers
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Sender-assigned message id
    pub fn message_id(&self) -> Option<&str> {
        self.message_id.as_deref()
    }

    /// Content type the payload arrived with
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Work counters for this envelope
    pub fn stats(&self) -> &EnvelopeStats {
        self.cache.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headers::MESSAGE_ID;
    use rawjson_core::JsonShape;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Widget {
        id: u32,
    }

    impl MessageType for Widget {
        fn message_urn() -> String {
            "urn:message:devices:Widget".to_string()
        }
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Gadget {
        name: String,
    }

    impl MessageType for Gadget {
        fn message_urn() -> String {
            "urn:message:devices:Gadget".to_string()
        }
    }

    fn envelope(value: Value, acceptance: Acceptance) -> Envelope {
        Envelope::new(JsonTree::from_value(value), acceptance)
    }

    #[test]
    fn test_decode_is_cached() {
        let envelope = envelope(json!({"id": 3}), Acceptance::default());

        let first = envelope.get_or_decode::<Widget>().unwrap();
        let second = envelope.get_or_decode::<Widget>().unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        let stats = envelope.stats().snapshot();
        assert_eq!(stats.decodes, 1);
        assert_eq!(stats.cache_hits, 1);
    }

    #[test]
    fn test_rejected_type_is_never_decoded() {
        let envelope = envelope(
            json!({"id": 3}),
            Acceptance::from_header("urn:message:devices:Gadget"),
        );

        let error = envelope.get_or_decode::<Widget>().unwrap_err();
        assert!(error.is_unsupported());
        assert_eq!(error.target(), "urn:message:devices:Widget");

        let stats = envelope.stats().snapshot();
        assert_eq!(stats.decodes, 0);
        assert_eq!(stats.rejections, 1);

        // Still rejected, and still no decode
        assert!(envelope.get_or_decode::<Widget>().unwrap_err().is_unsupported());
        assert_eq!(envelope.stats().snapshot().decodes, 0);
    }

    #[test]
    fn test_declaration_is_case_insensitive() {
        let envelope = envelope(
            json!({"id": 3}),
            Acceptance::from_header("URN:MESSAGE:DEVICES:WIDGET"),
        );
        assert_eq!(*envelope.get_or_decode::<Widget>().unwrap(), Widget { id: 3 });
    }

    #[test]
    fn test_any_mode_overrides_declaration() {
        let envelope = envelope(
            json!({"id": 3}),
            Acceptance::from_header("urn:message:devices:Gadget").with_any_message_type(true),
        );
        assert!(envelope.get_or_decode::<Widget>().is_ok());
    }

    #[test]
    fn test_raw_json_always_accepted() {
        let envelope = envelope(
            json!({"id": 3}),
            Acceptance::from_header("urn:message:devices:Gadget"),
        );
        let raw = envelope.get_or_decode::<Value>().unwrap();
        assert_eq!(*raw, json!({"id": 3}));
    }

    #[test]
    fn test_failure_does_not_affect_other_types() {
        let envelope = envelope(json!({"id": 3}), Acceptance::default());

        let error = envelope.get_or_decode::<Gadget>().unwrap_err();
        assert!(error.is_malformed());
        assert_eq!(error.shape(), Some(JsonShape::Object));

        assert!(envelope.get_or_decode::<Widget>().is_ok());
        assert!(envelope.attempt::<Gadget>().is_rejected());
        assert!(envelope.attempt::<Widget>().is_decoded());
    }

    #[test]
    fn test_has_message_type_only_after_success() {
        let envelope = envelope(json!({"id": 3}), Acceptance::default());

        assert!(!envelope.has_message_type::<Widget>());
        assert!(envelope.try_get::<Widget>().is_none());
        assert!(envelope.attempt::<Widget>().is_not_attempted());

        envelope.get_or_decode::<Widget>().unwrap();
        assert!(envelope.has_message_type::<Widget>());

        let _ = envelope.get_or_decode::<Gadget>();
        assert!(!envelope.has_message_type::<Gadget>());
    }

    #[test]
    fn test_metadata() {
        let headers = Headers::new().with(MESSAGE_ID, " abc-123 ");
        let envelope = envelope(json!(null), Acceptance::from_header("a;b"))
            .with_headers(headers)
            .with_content_type("application/vnd.masstransit+json");

        assert_eq!(envelope.message_id(), Some("abc-123"));
        assert_eq!(envelope.content_type(), "application/vnd.masstransit+json");
        assert_eq!(envelope.supported_message_types(), &["a", "b"]);
        assert_eq!(envelope.json(), &json!({}));
    }

    #[test]
    fn test_envelope_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Envelope>();
    }
}
