//! Message types and the array-tolerance capability
//!
//! A type becomes decodable from an envelope by implementing [`MessageType`].
//! A type additionally becomes *array-tolerant* by implementing
//! [`ArrayMessage`]: it declares one named collection field and its element
//! type, and the decoder then accepts a bare array, a bare object, or an
//! already-wrapped object for it.
//!
//! Both traits are normally derived with `rawjson_macros`:
//!
//! ```rust,ignore
//! #[derive(Debug, Default, Serialize, Deserialize, ArrayMessage)]
//! struct GatewayReport {
//!     #[serde(default)]
//!     items: Vec<BeaconReading>,
//! }
//! ```
//!
//! # Descriptors
//!
//! [`TargetDescriptor::of`] describes a type: its identity, canonical URN, and
//! array shape. Descriptors depend only on static type information, so they
//! are built once per type and memoized process-wide.

use crate::decoder;
use crate::error::DecodeError;
use crate::value::JsonTree;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::any::{type_name, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

/// A type that can be requested from an envelope
pub trait MessageType: DeserializeOwned + Send + Sync + 'static {
    /// Canonical type identifier matched against sender declarations
    ///
    /// Defaults to [`default_urn`] of the Rust type path.
    fn message_urn() -> String {
        default_urn::<Self>()
    }

    /// Collection field and element type for array-tolerant types
    fn array_shape() -> Option<ArrayShape> {
        None
    }

    /// Decode this type from a parsed tree
    ///
    /// The default is ordinary structural decoding. Array-tolerant types
    /// route through [`decoder::decode_array_tolerant`].
    fn decode_tree(tree: &JsonTree) -> Result<Self, DecodeError> {
        decoder::decode_plain(tree)
    }
}

/// Capability marker for array-tolerant message types
///
/// The implementing type holds one ordered collection of `Item` under the
/// field named `FIELD`. Its `Default` must carry an empty collection, which
/// is what an empty payload decodes to.
pub trait ArrayMessage: MessageType + Default {
    /// Element type of the collection
    type Item: DeserializeOwned + Send + Sync + 'static;

    /// Name of the collection field on the wire
    const FIELD: &'static str;

    /// Build a message whose collection is `items` and other fields default
    fn from_items(items: Vec<Self::Item>) -> Self;

    /// The decoded collection
    fn items(&self) -> &[Self::Item];

    /// Shape descriptor for this type
    fn shape() -> ArrayShape {
        ArrayShape::new(Self::FIELD, type_name::<Self::Item>())
    }
}

/// Field name and element type of an array-tolerant message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArrayShape {
    /// Wire name of the collection field
    pub field: &'static str,
    /// Rust type name of the element
    pub element: &'static str,
}

impl ArrayShape {
    /// Create a shape descriptor
    pub const fn new(field: &'static str, element: &'static str) -> Self {
        Self { field, element }
    }
}

/// Static description of a requested message type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetDescriptor {
    type_id: TypeId,
    type_name: &'static str,
    urn: String,
    array: Option<ArrayShape>,
}

impl TargetDescriptor {
    /// Describe `T`, reusing the process-wide descriptor when one exists
    pub fn of<T: MessageType>() -> Arc<TargetDescriptor> {
        let type_id = TypeId::of::<T>();
        let registry = REGISTRY.get_or_init(Default::default);

        if let Some(found) = registry
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&type_id)
        {
            return Arc::clone(found);
        }

        let descriptor = Arc::new(TargetDescriptor {
            type_id,
            type_name: type_name::<T>(),
            urn: T::message_urn(),
            array: T::array_shape(),
        });

        let mut registry = registry.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(registry.entry(type_id).or_insert(descriptor))
    }

    /// Identity of the Rust type
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Rust type name
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Canonical type identifier
    pub fn urn(&self) -> &str {
        &self.urn
    }

    /// Array shape, for array-tolerant types
    pub fn array_shape(&self) -> Option<ArrayShape> {
        self.array
    }

    /// True when the type carries the array-tolerance capability
    pub fn is_array_tolerant(&self) -> bool {
        self.array.is_some()
    }

    /// True for the raw JSON value, which every envelope can hand out
    pub fn is_raw_tree(&self) -> bool {
        self.type_id == TypeId::of::<serde_json::Value>()
    }
}

type Registry = RwLock<HashMap<TypeId, Arc<TargetDescriptor>>>;

static REGISTRY: OnceLock<Registry> = OnceLock::new();

/// Default canonical identifier for a Rust type
///
/// `devices::messages::GatewayReport` becomes
/// `urn:message:devices:messages:GatewayReport`.
pub fn default_urn<T: ?Sized>() -> String {
    format!("urn:message:{}", type_name::<T>().replace("::", ":"))
}

impl MessageType for serde_json::Value {
    fn message_urn() -> String {
        "urn:message:json:Value".to_string()
    }

    fn decode_tree(tree: &JsonTree) -> Result<Self, DecodeError> {
        Ok(tree.as_value().clone())
    }
}

/// Plain-text body published back to devices
///
/// Encoded with `text/plain` the body is written verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawText {
    /// Text written to the wire
    pub body: String,
}

impl RawText {
    /// Create a text message
    pub fn new(body: impl Into<String>) -> Self {
        Self { body: body.into() }
    }
}

impl MessageType for RawText {
    fn message_urn() -> String {
        "urn:message:rawjson:RawText".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, Deserialize)]
    struct Ping {
        #[allow(dead_code)]
        seq: u32,
    }

    impl MessageType for Ping {}

    #[derive(Debug, Default, Deserialize)]
    struct Batch {
        #[serde(default)]
        items: Vec<Ping>,
    }

    impl MessageType for Batch {
        fn message_urn() -> String {
            "urn:message:Batch".to_string()
        }

        fn array_shape() -> Option<ArrayShape> {
            Some(<Self as ArrayMessage>::shape())
        }
    }

    impl ArrayMessage for Batch {
        type Item = Ping;
        const FIELD: &'static str = "items";

        fn from_items(items: Vec<Ping>) -> Self {
            Self { items }
        }

        fn items(&self) -> &[Ping] {
            &self.items
        }
    }

    #[test]
    fn test_default_urn() {
        assert_eq!(default_urn::<Ping>(), "urn:message:rawjson_core:message:tests:Ping");
    }

    #[test]
    fn test_descriptor_plain() {
        let descriptor = TargetDescriptor::of::<Ping>();
        assert!(!descriptor.is_array_tolerant());
        assert!(!descriptor.is_raw_tree());
        assert_eq!(descriptor.urn(), default_urn::<Ping>());
        assert_eq!(descriptor.type_id(), TypeId::of::<Ping>());
    }

    #[test]
    fn test_descriptor_array() {
        let descriptor = TargetDescriptor::of::<Batch>();
        let shape = descriptor.array_shape().unwrap();
        assert_eq!(shape.field, "items");
        assert!(shape.element.ends_with("Ping"));
        assert_eq!(descriptor.urn(), "urn:message:Batch");
    }

    #[test]
    fn test_descriptor_is_memoized() {
        let first = TargetDescriptor::of::<Batch>();
        let second = TargetDescriptor::of::<Batch>();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_raw_tree_descriptor() {
        assert!(TargetDescriptor::of::<serde_json::Value>().is_raw_tree());
    }
}
