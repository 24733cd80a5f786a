//! Envelopes, transport boundary and consumer dispatch for rawjson
//!
//! `rawjson-core` knows how to decode one tree into one type. This crate
//! wraps a received message in an [`Envelope`] that parses the payload
//! once, filters requested types against the sender's declaration, and
//! caches each type's decode outcome for every consumer of the message.
//!
//! # Core Features
//!
//! - **Envelope**: per-message decode cache with `get_or_decode`
//! - **Deserializers**: content-type keyed [`DeserializerRegistry`]
//! - **Consumers**: async [`Consumer<T>`] trait and [`consumer_fn`]
//! - **Dispatch**: [`Dispatcher`] fans one envelope out to every consumer
//! - **Outbound**: [`OutboundEncoder`] for JSON and plain-text replies
//! - **Metrics**: OpenTelemetry instruments in [`EnvelopeMetrics`]
//!
//! # Quick Start
//!
//! ```rust
//! use rawjson_core::{decoder, ArrayMessage, ArrayShape, DecodeError, JsonTree, MessageType};
//! use rawjson_envelope::{DeserializerRegistry, InboundMessage, RawOptions};
//! use serde::Deserialize;
//!
//! #[derive(Debug, Deserialize)]
//! struct Reading { mac: String, rssi: i32 }
//!
//! #[derive(Debug, Default, Deserialize)]
//! struct Report { #[serde(default)] items: Vec<Reading> }
//!
//! impl MessageType for Report {
//!     fn array_shape() -> Option<ArrayShape> { Some(<Self as ArrayMessage>::shape()) }
//!     fn decode_tree(tree: &JsonTree) -> Result<Self, DecodeError> {
//!         decoder::decode_array_tolerant(tree)
//!     }
//! }
//!
//! impl ArrayMessage for Report {
//!     type Item = Reading;
//!     const FIELD: &'static str = "items";
//!     fn from_items(items: Vec<Reading>) -> Self { Self { items } }
//!     fn items(&self) -> &[Reading] { &self.items }
//! }
//!
//! let registry = DeserializerRegistry::with_defaults(RawOptions::default());
//! let message = InboundMessage::new(r#"[{"mac":"AA","rssi":-60},{"mac":"BB","rssi":-71}]"#);
//! let envelope = registry.deserialize(&message).unwrap();
//!
//! let report = envelope.get_or_decode::<Report>().unwrap();
//! assert_eq!(report.items.len(), 2);
//! ```
//!
//! # Concurrency
//!
//! An [`Envelope`] is `Send + Sync`. Share it with `Arc`; concurrent
//! requests for one type decode once, requests for different types do not
//! wait on each other.

pub mod cache;
pub mod consumer;
pub mod deserializer;
pub mod dispatcher;
pub mod envelope;
pub mod headers;
pub mod inbound;
pub mod metrics;
pub mod options;
pub mod outbound;

pub use cache::{DecodeAttempt, DecodeCache, EnvelopeStats, StatsSnapshot};
pub use consumer::{consumer_fn, ConsumeContext, Consumer, FnConsumer};
pub use deserializer::{DeserializerRegistry, MessageDeserializer, RawJsonDeserializer};
pub use dispatcher::{ConsumerOutcome, ConsumerReport, DispatchReport, Dispatcher, DispatcherBuilder};
pub use envelope::Envelope;
pub use headers::Headers;
pub use inbound::InboundMessage;
pub use metrics::EnvelopeMetrics;
pub use options::RawOptions;
pub use outbound::{OutboundEncoder, OutboundMessage};

// Re-export async_trait so consumers can be implemented without a direct dependency
pub use async_trait::async_trait;
