//! Derive macros for rawjson message types
//!
//! A message type tells the decoder, at compile time, what it is called on
//! the wire and whether it is array-tolerant. These derives write that
//! registration so no runtime type inspection is needed.
//!
//! # Available Macros
//!
//! - `#[derive(Message)]`: implements `MessageType` for an ordinary type
//! - `#[derive(ArrayMessage)]`: implements `MessageType` and `ArrayMessage`
//!   for a type holding one `Vec<E>` collection field
//!
//! Both accept `#[message(urn = "...")]` to override the canonical type
//! identifier. `ArrayMessage` uses the field marked `#[items]`, or the field
//! named `items` when none is marked.
//!
//! The generated code refers to `::rawjson_core`, so the deriving crate must
//! depend on `rawjson-core` directly.
//!
//! # Examples
//!
//! ```ignore
//! use rawjson_macros::{ArrayMessage, Message};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Deserialize, Serialize)]
//! struct BeaconReading {
//!     mac: String,
//! }
//!
//! #[derive(Debug, Default, Deserialize, Serialize, ArrayMessage)]
//! #[message(urn = "urn:message:devices:GatewayReport")]
//! struct GatewayReport {
//!     #[serde(default)]
//!     items: Vec<BeaconReading>,
//! }
//!
//! #[derive(Debug, Deserialize, Message)]
//! struct Heartbeat {
//!     uptime: u64,
//! }
//! ```

mod message;

use proc_macro::TokenStream;

/// Derive `MessageType` for an ordinary message
///
/// The type must implement `serde::Deserialize`. Decoding uses ordinary
/// structural rules; no shape adaptation is applied.
#[proc_macro_derive(Message, attributes(message))]
pub fn derive_message(input: TokenStream) -> TokenStream {
    message::derive_message_impl(input)
}

/// Derive `MessageType` and `ArrayMessage` for an array-tolerant message
///
/// The type must implement `serde::Deserialize` and `Default`, and hold its
/// collection in a `Vec<E>` field. Mark the field with `#[items]` unless it
/// is already named `items`. Give the field `#[serde(default)]` so a
/// wrapped payload without it still decodes.
#[proc_macro_derive(ArrayMessage, attributes(message, items))]
pub fn derive_array_message(input: TokenStream) -> TokenStream {
    message::derive_array_message_impl(input)
}
