//! rawjson - array-tolerant raw JSON message handling
//!
//! This is the convenience crate that re-exports the rawjson sub-crates.
//!
//! # Architecture
//!
//! - **rawjson-core**: message types, JSON tree, decoder, acceptance filter,
//!   encoders, errors and observability
//! - **rawjson-envelope**: per-message decode cache, deserializers, consumer
//!   dispatch and outbound encoding
//! - **rawjson-macros**: `#[derive(Message)]` and `#[derive(ArrayMessage)]`
//!
//! The derive macros expand to paths under `::rawjson_core`, so a crate that
//! uses them also depends on `rawjson-core` directly.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use rawjson::{ArrayMessage, Message};
//! use serde::Deserialize;
//!
//! #[derive(Debug, Deserialize, Message)]
//! struct BeaconReading { mac: String, rssi: i32 }
//!
//! #[derive(Debug, Default, Deserialize, ArrayMessage)]
//! struct GatewayReport {
//!     #[serde(default)]
//!     items: Vec<BeaconReading>,
//! }
//!
//! # #[tokio::main]
//! # async fn main() {
//! let dispatcher = rawjson::Dispatcher::builder()
//!     .consumer("report", rawjson::consumer_fn(|ctx: rawjson::ConsumeContext<GatewayReport>| async move {
//!         println!("{} readings", ctx.items.len());
//!         Ok(())
//!     }))
//!     .build();
//!
//! // A bare object, an array, or an already wrapped report all work
//! let message = rawjson::InboundMessage::new(r#"{"mac":"AA:BB","rssi":-60}"#);
//! dispatcher.dispatch(&message).await.unwrap();
//! # }
//! ```

pub use rawjson_core as core;
pub use rawjson_envelope as envelope;
pub use rawjson_macros as macros;

pub use rawjson_core::{
    decoder, Acceptance, ArrayMessage, DecodeError, EncodeError, Error, JsonTree, MessageType,
    ParseError, RawText, Result,
};
pub use rawjson_envelope::{
    consumer_fn, ConsumeContext, Consumer, Dispatcher, Envelope, Headers, InboundMessage,
    OutboundEncoder, OutboundMessage, RawOptions,
};
pub use rawjson_macros::{ArrayMessage, Message};
