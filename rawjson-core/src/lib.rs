//! Array-tolerant JSON message decoding for rawjson
//!
//! Devices and gateways often publish either a single JSON object or a JSON
//! array of objects on the same channel, while the application always wants
//! a collection. This crate decodes a raw payload into statically known
//! message types and adapts the payload's shape when the type asks for it.
//!
//! - **Message types**: [`MessageType`] and the [`ArrayMessage`] capability
//! - **JSON tree**: [`JsonTree`], parsed once per payload
//! - **Decoder**: [`decoder`], the type-directed (and array-tolerant) decoder
//! - **Acceptance**: [`Acceptance`], the sender-declared type filter
//! - **Codec**: [`codec`], outbound encoders
//! - **Errors**: [`ParseError`], [`DecodeError`], [`EncodeError`]
//! - **Observability**: OpenTelemetry and `tracing` setup
//!
//! # Architecture
//!
//! The crate is transport-agnostic. `rawjson-envelope` builds the
//! per-envelope decode cache and the transport boundary on top of it.
//!
//! # Example
//!
//! ```rust
//! use rawjson_core::{decoder, ArrayMessage, ArrayShape, DecodeError, JsonTree, MessageType};
//! use serde::Deserialize;
//!
//! #[derive(Debug, Deserialize, PartialEq)]
//! struct Beacon { mac: String }
//!
//! #[derive(Debug, Default, Deserialize)]
//! struct Readings {
//!     #[serde(default)]
//!     items: Vec<Beacon>,
//! }
//!
//! impl MessageType for Readings {
//!     fn array_shape() -> Option<ArrayShape> {
//!         Some(<Self as ArrayMessage>::shape())
//!     }
//!     fn decode_tree(tree: &JsonTree) -> Result<Self, DecodeError> {
//!         decoder::decode_array_tolerant(tree)
//!     }
//! }
//!
//! impl ArrayMessage for Readings {
//!     type Item = Beacon;
//!     const FIELD: &'static str = "items";
//!     fn from_items(items: Vec<Beacon>) -> Self { Self { items } }
//!     fn items(&self) -> &[Beacon] { &self.items }
//! }
//!
//! let tree = JsonTree::parse(br#"{"mac":"AA:BB"}"#).unwrap();
//! let readings: Readings = decoder::decode(&tree).unwrap();
//! assert_eq!(readings.items(), &[Beacon { mac: "AA:BB".into() }]);
//! ```

pub mod acceptance;
pub mod codec;
pub mod decoder;
pub mod error;
pub mod message;
pub mod observability;
pub mod value;

pub use acceptance::Acceptance;
pub use codec::{JsonEncoder, MessageEncoder, TextEncoder};
pub use error::{DecodeError, EncodeError, Error, ItemError, ParseError, Result};
pub use message::{default_urn, ArrayMessage, ArrayShape, MessageType, RawText, TargetDescriptor};
pub use observability::{init_observability, shutdown_observability, ObservabilityConfig};
pub use value::{JsonShape, JsonTree};
