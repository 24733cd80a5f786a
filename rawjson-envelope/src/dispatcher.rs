//! Consumer dispatch
//!
//! The [`Dispatcher`] is the inbound pipeline: it deserializes a received
//! message once, then hands the envelope to every registered consumer
//! concurrently. Each consumer asks the envelope for its own type, so two
//! consumers of the same type share one decode and a type that does not fit
//! only skips the consumers that wanted it.
//!
//! # Outcomes
//!
//! - The payload is not JSON: `dispatch` returns the `ParseError` and no
//!   consumer runs
//! - A consumer's type is rejected or malformed: that consumer is
//!   [`ConsumerOutcome::Skipped`]
//! - A consumer returns an error: that consumer is [`ConsumerOutcome::Failed`]
//!
//! # Examples
//!
//! ```rust
//! use rawjson_core::MessageType;
//! use rawjson_envelope::{consumer_fn, ConsumeContext, Dispatcher, InboundMessage};
//! use serde::Deserialize;
//!
//! #[derive(Debug, Deserialize)]
//! struct Ping { seq: u32 }
//! impl MessageType for Ping {}
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let dispatcher = Dispatcher::builder()
//!     .consumer("pings", consumer_fn(|ctx: ConsumeContext<Ping>| async move {
//!         assert_eq!(ctx.seq, 1);
//!         Ok(())
//!     }))
//!     .build();
//!
//! let report = dispatcher.dispatch(&InboundMessage::new(r#"{"seq":1}"#)).await.unwrap();
//! assert_eq!(report.consumed(), 1);
//! # }
//! ```

use crate::consumer::{ConsumeContext, Consumer};
use crate::deserializer::DeserializerRegistry;
use crate::envelope::Envelope;
use crate::inbound::InboundMessage;
use crate::metrics::EnvelopeMetrics;
use crate::options::RawOptions;
use crate::outbound::OutboundEncoder;
use async_trait::async_trait;
use futures::future::join_all;
use rawjson_core::{DecodeError, MessageType, ParseError, TargetDescriptor};
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Instant;

/// What happened to one consumer for one envelope
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsumerOutcome {
    /// The consumer ran and succeeded
    Consumed,
    /// The consumer's type could not be had from this envelope
    Skipped(DecodeError),
    /// The consumer ran and returned an error
    Failed(String),
}

impl ConsumerOutcome {
    /// Short label used in logs and metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsumerOutcome::Consumed => "consumed",
            ConsumerOutcome::Skipped(_) => "skipped",
            ConsumerOutcome::Failed(_) => "failed",
        }
    }
}

/// One consumer's line in a [`DispatchReport`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumerReport {
    /// Name the consumer was registered under
    pub consumer: String,
    /// URN of the type the consumer asked for
    pub urn: String,
    /// What happened
    pub outcome: ConsumerOutcome,
}

/// Result of dispatching one envelope
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Sender-assigned message id, if any
    pub message_id: Option<String>,
    /// One entry per registered consumer, in registration order
    pub consumers: Vec<ConsumerReport>,
}

impl DispatchReport {
    /// Outcome for a named consumer
    pub fn outcome(&self, consumer: &str) -> Option<&ConsumerOutcome> {
        self.consumers
            .iter()
            .find(|report| report.consumer == consumer)
            .map(|report| &report.outcome)
    }

    /// Number of consumers that succeeded
    pub fn consumed(&self) -> usize {
        self.count(|outcome| matches!(outcome, ConsumerOutcome::Consumed))
    }

    /// Number of consumers skipped because their type did not apply
    pub fn skipped(&self) -> usize {
        self.count(|outcome| matches!(outcome, ConsumerOutcome::Skipped(_)))
    }

    /// Number of consumers that returned an error
    pub fn failed(&self) -> usize {
        self.count(|outcome| matches!(outcome, ConsumerOutcome::Failed(_)))
    }

    /// True when no consumer failed
    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    fn count(&self, predicate: impl Fn(&ConsumerOutcome) -> bool) -> usize {
        self.consumers
            .iter()
            .filter(|report| predicate(&report.outcome))
            .count()
    }
}

/// A consumer with its message type erased
#[async_trait]
trait ErasedConsumer: Send + Sync {
    fn urn(&self) -> String;

    async fn deliver(&self, envelope: Arc<Envelope>, encoder: OutboundEncoder) -> ConsumerOutcome;
}

struct TypedConsumer<T, C> {
    consumer: C,
    _message: PhantomData<fn() -> T>,
}

#[async_trait]
impl<T, C> ErasedConsumer for TypedConsumer<T, C>
where
    T: MessageType,
    C: Consumer<T> + 'static,
{
    fn urn(&self) -> String {
        TargetDescriptor::of::<T>().urn().to_string()
    }

    async fn deliver(&self, envelope: Arc<Envelope>, encoder: OutboundEncoder) -> ConsumerOutcome {
        let message = match envelope.get_or_decode::<T>() {
            Ok(message) => message,
            Err(error) => return ConsumerOutcome::Skipped(error),
        };

        match self
            .consumer
            .consume(ConsumeContext::new(message, envelope, encoder))
            .await
        {
            Ok(()) => ConsumerOutcome::Consumed,
            Err(error) => ConsumerOutcome::Failed(error.to_string()),
        }
    }
}

struct Registration {
    name: String,
    consumer: Arc<dyn ErasedConsumer>,
}

/// Inbound pipeline: deserialize once, fan out to consumers
///
/// Cheap to clone; clones share registrations.
#[derive(Clone)]
pub struct Dispatcher {
    registry: DeserializerRegistry,
    consumers: Arc<Vec<Registration>>,
    encoder: OutboundEncoder,
    metrics: Option<Arc<EnvelopeMetrics>>,
}

impl Dispatcher {
    /// Start building a dispatcher
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::new()
    }

    /// Names of the registered consumers, in registration order
    pub fn consumer_names(&self) -> Vec<&str> {
        self.consumers.iter().map(|r| r.name.as_str()).collect()
    }

    /// The deserializers in use
    pub fn registry(&self) -> &DeserializerRegistry {
        &self.registry
    }

    /// The encoder handed to consumers for replies
    pub fn encoder(&self) -> &OutboundEncoder {
        &self.encoder
    }

    /// Deserialize a message into a shareable envelope
    ///
    /// # Errors
    ///
    /// Any `ParseError` from the deserializer registry.
    pub fn deserialize(&self, message: &InboundMessage) -> Result<Arc<Envelope>, ParseError> {
        match self.registry.deserialize(message) {
            Ok(envelope) => {
                if let Some(metrics) = &self.metrics {
                    metrics.record_envelope(envelope.content_type());
                }
                Ok(Arc::new(envelope))
            }
            Err(error) => {
                if let Some(metrics) = &self.metrics {
                    metrics.record_parse_failure(parse_failure_reason(&error));
                }
                Err(error)
            }
        }
    }

    /// Deserialize a message and run every consumer on it
    ///
    /// # Errors
    ///
    /// A `ParseError` aborts the dispatch before any consumer runs.
    #[tracing::instrument(
        skip(self, message),
        fields(message_id = message.headers.message_id(), bytes = message.payload.len())
    )]
    pub async fn dispatch(&self, message: &InboundMessage) -> Result<DispatchReport, ParseError> {
        let envelope = self.deserialize(message)?;
        Ok(self.dispatch_envelope(envelope).await)
    }

    /// Run every consumer on an already deserialized envelope
    pub async fn dispatch_envelope(&self, envelope: Arc<Envelope>) -> DispatchReport {
        let started = Instant::now();

        let deliveries = self.consumers.iter().map(|registration| {
            let envelope = Arc::clone(&envelope);
            let encoder = self.encoder.clone();
            async move {
                let outcome = registration.consumer.deliver(envelope, encoder).await;
                ConsumerReport {
                    consumer: registration.name.clone(),
                    urn: registration.consumer.urn(),
                    outcome,
                }
            }
        });
        let consumers = join_all(deliveries).await;

        for report in &consumers {
            match &report.outcome {
                ConsumerOutcome::Consumed => {
                    tracing::debug!(consumer = %report.consumer, urn = %report.urn, "consumer succeeded")
                }
                ConsumerOutcome::Skipped(error) => {
                    tracing::debug!(consumer = %report.consumer, urn = %report.urn, error = %error, "consumer skipped")
                }
                ConsumerOutcome::Failed(error) => {
                    tracing::warn!(consumer = %report.consumer, urn = %report.urn, error = %error, "consumer failed")
                }
            }

            if let Some(metrics) = &self.metrics {
                metrics.record_consumer(&report.consumer, report.outcome.as_str());
                if let ConsumerOutcome::Skipped(error) = &report.outcome {
                    let shape = error.shape().map_or("none", |shape| shape.as_str());
                    metrics.record_decode(&report.urn, error.kind(), shape);
                } else {
                    metrics.record_decode(&report.urn, "decoded", envelope.tree().shape().as_str());
                }
            }
        }

        let elapsed = started.elapsed();
        if let Some(metrics) = &self.metrics {
            metrics.record_dispatch(consumers.len(), elapsed.as_secs_f64());
            metrics.record_envelope_stats(&envelope.stats().snapshot());
        }

        let report = DispatchReport {
            message_id: envelope.message_id().map(str::to_string),
            consumers,
        };

        tracing::debug!(
            consumed = report.consumed(),
            skipped = report.skipped(),
            failed = report.failed(),
            elapsed_ms = elapsed.as_millis() as u64,
            "envelope dispatched"
        );

        report
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("registry", &self.registry)
            .field("consumers", &self.consumer_names())
            .field("encoder", &self.encoder)
            .field("metrics", &self.metrics.is_some())
            .finish()
    }
}

fn parse_failure_reason(error: &ParseError) -> &'static str {
    match error {
        ParseError::Syntax { .. } => "syntax",
        ParseError::UnsupportedEncoding(_) => "encoding",
        ParseError::UnsupportedContentType(_) => "content_type",
    }
}

/// Builder for [`Dispatcher`]
pub struct DispatcherBuilder {
    options: RawOptions,
    registry: Option<DeserializerRegistry>,
    consumers: Vec<Registration>,
    encoder: Option<OutboundEncoder>,
    metrics: Option<EnvelopeMetrics>,
}

impl DispatcherBuilder {
    /// Create a builder with default options and no consumers
    pub fn new() -> Self {
        Self {
            options: RawOptions::default(),
            registry: None,
            consumers: Vec::new(),
            encoder: None,
            metrics: None,
        }
    }

    /// Set the serializer options
    ///
    /// Applied to the default deserializers and to the reply encoder.
    pub fn options(mut self, options: RawOptions) -> Self {
        self.options = options;
        self
    }

    /// Use a custom deserializer registry instead of the defaults
    pub fn deserializers(mut self, registry: DeserializerRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Register a consumer for message type `T`
    pub fn consumer<T, C>(mut self, name: impl Into<String>, consumer: C) -> Self
    where
        T: MessageType,
        C: Consumer<T> + 'static,
    {
        self.consumers.push(Registration {
            name: name.into(),
            consumer: Arc::new(TypedConsumer {
                consumer,
                _message: PhantomData,
            }),
        });
        self
    }

    /// Set the encoder consumers use for replies
    pub fn encoder(mut self, encoder: OutboundEncoder) -> Self {
        self.encoder = Some(encoder);
        self
    }

    /// Record OpenTelemetry metrics
    pub fn with_metrics(mut self, metrics: EnvelopeMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Record OpenTelemetry metrics on the global meter provider
    pub fn with_default_metrics(self, service_name: impl Into<String>) -> Self {
        self.with_metrics(EnvelopeMetrics::new(service_name))
    }

    /// Build the dispatcher
    pub fn build(self) -> Dispatcher {
        let options = self.options;
        let metrics = self.metrics.map(Arc::new);

        let mut encoder = self.encoder.unwrap_or_default().with_options(options);
        if let Some(metrics) = &metrics {
            encoder = encoder.with_metrics(Arc::clone(metrics));
        }

        Dispatcher {
            registry: self
                .registry
                .unwrap_or_else(|| DeserializerRegistry::with_defaults(options)),
            consumers: Arc::new(self.consumers),
            encoder,
            metrics,
        }
    }
}

impl Default for DispatcherBuilder {
    fn default() -> Self {
        Self::new()
    }
}
