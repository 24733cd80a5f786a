//! Business-logic consumers
//!
//! A [`Consumer<T>`] handles messages of one type. It receives a
//! [`ConsumeContext`] holding the decoded value and the envelope it came
//! from, so it can look up other views of the same payload or build a reply.
//!
//! # Creating consumers
//!
//! 1. Implement [`Consumer<T>`] on your own type
//! 2. Wrap an async closure with [`consumer_fn`]
//!
//! # Examples
//!
//! ```rust
//! use rawjson_core::{MessageType, Result};
//! use rawjson_envelope::{consumer_fn, ConsumeContext};
//! use serde::Deserialize;
//!
//! #[derive(Debug, Deserialize)]
//! struct Ping { seq: u32 }
//! impl MessageType for Ping {}
//!
//! let consumer = consumer_fn(|ctx: ConsumeContext<Ping>| async move {
//!     println!("ping {}", ctx.seq);
//!     Ok(())
//! });
//! # let _ = consumer;
//! ```

use crate::envelope::Envelope;
use crate::headers::Headers;
use crate::outbound::{OutboundEncoder, OutboundMessage};
use async_trait::async_trait;
use rawjson_core::{EncodeError, MessageType, RawText, Result};
use serde::Serialize;
use std::future::Future;
use std::marker::PhantomData;
use std::ops::Deref;
use std::sync::Arc;

/// Handles decoded messages of type `T`
#[async_trait]
pub trait Consumer<T: MessageType>: Send + Sync {
    /// Handle one message
    ///
    /// An error is reported for this consumer only; other consumers of the
    /// same envelope still run.
    async fn consume(&self, ctx: ConsumeContext<T>) -> Result<()>;
}

/// What a consumer gets for one message
///
/// Dereferences to the decoded message.
#[derive(Debug)]
pub struct ConsumeContext<T> {
    message: Arc<T>,
    envelope: Arc<Envelope>,
    encoder: OutboundEncoder,
}

impl<T> ConsumeContext<T> {
    /// Create a context
    pub fn new(message: Arc<T>, envelope: Arc<Envelope>, encoder: OutboundEncoder) -> Self {
        Self {
            message,
            envelope,
            encoder,
        }
    }

    /// The decoded message
    pub fn message(&self) -> &T {
        &self.message
    }

    /// Shared handle to the decoded message
    pub fn message_arc(&self) -> Arc<T> {
        Arc::clone(&self.message)
    }

    /// The envelope the message came from
    pub fn envelope(&self) -> &Arc<Envelope> {
        &self.envelope
    }

    /// Sender-assigned message id
    pub fn message_id(&self) -> Option<&str> {
        self.envelope.message_id()
    }

    /// Transport headers of the received message
    pub fn headers(&self) -> &Headers {
        self.envelope.headers()
    }

    /// Encode a reply with the dispatcher's encoder
    pub fn encode<M: MessageType + Serialize>(
        &self,
        message: &M,
    ) -> std::result::Result<OutboundMessage, EncodeError> {
        self.encoder.encode_message(message)
    }

    /// Encode a plain-text reply
    ///
    /// Uses the dispatcher's options and metrics with a `text/plain` encoder.
    pub fn reply_text(
        &self,
        body: impl Into<String>,
    ) -> std::result::Result<OutboundMessage, EncodeError> {
        self.encoder.to_text().encode_message(&RawText::new(body))
    }
}

impl<T> Deref for ConsumeContext<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.message
    }
}

/// Consumer backed by an async closure
pub struct FnConsumer<T, F> {
    func: F,
    _message: PhantomData<fn() -> T>,
}

impl<T, F> FnConsumer<T, F> {
    /// Wrap a closure
    pub fn new(func: F) -> Self {
        Self {
            func,
            _message: PhantomData,
        }
    }
}

#[async_trait]
impl<T, F, Fut> Consumer<T> for FnConsumer<T, F>
where
    T: MessageType,
    F: Fn(ConsumeContext<T>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    async fn consume(&self, ctx: ConsumeContext<T>) -> Result<()> {
        (self.func)(ctx).await
    }
}

/// Create a consumer from an async closure
pub fn consumer_fn<T, F, Fut>(func: F) -> FnConsumer<T, F>
where
    T: MessageType,
    F: Fn(ConsumeContext<T>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    FnConsumer::new(func)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rawjson_core::{Acceptance, Error, JsonTree};
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Ping {
        seq: u32,
    }

    impl MessageType for Ping {}

    fn context() -> ConsumeContext<Ping> {
        let envelope = Arc::new(Envelope::new(
            JsonTree::from_value(json!({"seq": 9})),
            Acceptance::default(),
        ));
        let ping = envelope.get_or_decode::<Ping>().unwrap();
        ConsumeContext::new(ping, envelope, OutboundEncoder::json())
    }

    #[tokio::test]
    async fn test_fn_consumer() {
        let consumer = consumer_fn(|ctx: ConsumeContext<Ping>| async move {
            if ctx.seq == 9 {
                Ok(())
            } else {
                Err(Error::Consumer("wrong seq".into()))
            }
        });

        assert!(consumer.consume(context()).await.is_ok());
    }

    #[tokio::test]
    async fn test_context_shares_envelope_cache() {
        let ctx = context();
        assert!(ctx.envelope().has_message_type::<Ping>());
        assert!(Arc::ptr_eq(&ctx.message_arc(), &ctx.envelope().get_or_decode::<Ping>().unwrap()));
        assert_eq!(ctx.message().seq, 9);
    }

    #[test]
    fn test_reply_text() {
        let reply = context().reply_text("ACK 9").unwrap();
        assert_eq!(&reply.body[..], b"ACK 9");
    }
}
