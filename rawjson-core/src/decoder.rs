//! Type-directed decoding of a parsed tree into a message type
//!
//! [`decode`] is the entry point: it asks the target type how it wants to be
//! decoded. Ordinary types take [`decode_plain`]. Array-tolerant types take
//! [`decode_array_tolerant`], which maps whatever shape the sender chose onto
//! the type's fixed collection field:
//!
//! | Payload                                   | Result                                   |
//! |-------------------------------------------|------------------------------------------|
//! | `{}` / empty / `null`                     | empty collection                         |
//! | object already carrying `FIELD: [...]`    | decoded directly as the message (pass-through) |
//! | `[e1, e2, ...]`                           | each element decoded, in order           |
//! | any other object or scalar                | decoded once as a single element         |
//!
//! Array elements are all attempted; when any fail, the error lists every
//! failing index in array order.
//!
//! A bare scalar is wrapped like an object, but its failure is reported with
//! `JsonShape::Scalar` so callers can tell the two apart.
//!
//! # Examples
//!
//! ```rust
//! use rawjson_core::{decoder, JsonTree, MessageType};
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct Heartbeat { uptime: u64 }
//! impl MessageType for Heartbeat {}
//!
//! let tree = JsonTree::parse(br#"{"uptime": 12}"#).unwrap();
//! let heartbeat: Heartbeat = decoder::decode(&tree).unwrap();
//! assert_eq!(heartbeat.uptime, 12);
//! ```

use crate::error::{DecodeError, ItemError};
use crate::message::{ArrayMessage, MessageType};
use crate::value::{JsonShape, JsonTree};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::any::type_name;

/// Decode `T` from a parsed tree
pub fn decode<T: MessageType>(tree: &JsonTree) -> Result<T, DecodeError> {
    T::decode_tree(tree)
}

/// Ordinary structural decoding, with no shape adaptation
///
/// # Errors
///
/// Any field or shape mismatch is `DecodeError::Malformed`.
pub fn decode_plain<T: MessageType>(tree: &JsonTree) -> Result<T, DecodeError> {
    T::deserialize(tree.as_value())
        .map_err(|e| DecodeError::malformed(T::message_urn(), tree.shape(), e.to_string()))
}

/// Array-tolerant decoding for types carrying the capability marker
///
/// # Errors
///
/// `DecodeError::Malformed` when array elements fail, or when a single
/// object or scalar does not decode as `T::Item`.
pub fn decode_array_tolerant<T: ArrayMessage>(tree: &JsonTree) -> Result<T, DecodeError> {
    let value = tree.as_value();

    if tree.is_empty_document() {
        tracing::trace!(target_type = type_name::<T>(), "empty payload decoded as empty collection");
        return Ok(T::from_items(Vec::new()));
    }

    match value {
        Value::Array(elements) => decode_elements::<T>(elements),
        Value::Object(map) if map.get(T::FIELD).is_some_and(Value::is_array) => {
            match T::deserialize(value) {
                Ok(message) => {
                    tracing::trace!(
                        target_type = type_name::<T>(),
                        field = T::FIELD,
                        "payload already wrapped, decoded directly"
                    );
                    Ok(message)
                }
                // Carries the field but not in T's shape; it may still be a
                // single element that happens to have a field of that name.
                Err(wrapped_error) => decode_single::<T>(value, JsonShape::Object)
                    .map_err(|_| {
                        DecodeError::malformed(T::message_urn(), JsonShape::Object, wrapped_error.to_string())
                    }),
            }
        }
        other => decode_single::<T>(other, JsonShape::of(other)),
    }
}

fn decode_elements<T: ArrayMessage>(elements: &[Value]) -> Result<T, DecodeError> {
    let mut items = Vec::with_capacity(elements.len());
    let mut failures = Vec::new();

    for (index, element) in elements.iter().enumerate() {
        match decode_item::<T::Item>(element) {
            Ok(item) => items.push(item),
            Err(e) => failures.push(ItemError {
                index,
                reason: e.to_string(),
            }),
        }
    }

    if !failures.is_empty() {
        tracing::debug!(
            target_type = type_name::<T>(),
            failed = failures.len(),
            total = elements.len(),
            "array payload has elements that do not decode"
        );
        return Err(DecodeError::Malformed {
            target: T::message_urn(),
            shape: JsonShape::Array,
            reason: format!("{} of {} items failed", failures.len(), elements.len()),
            items: failures,
        });
    }

    tracing::trace!(
        target_type = type_name::<T>(),
        items = items.len(),
        "array payload decoded into collection"
    );
    Ok(T::from_items(items))
}

fn decode_single<T: ArrayMessage>(value: &Value, shape: JsonShape) -> Result<T, DecodeError> {
    let item = decode_item::<T::Item>(value)
        .map_err(|e| DecodeError::malformed(T::message_urn(), shape, e.to_string()))?;

    tracing::trace!(
        target_type = type_name::<T>(),
        shape = %shape,
        "single payload wrapped into one-element collection"
    );
    Ok(T::from_items(vec![item]))
}

fn decode_item<E: DeserializeOwned>(value: &Value) -> Result<E, serde_json::Error> {
    E::deserialize(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::ArrayShape;
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, Deserialize)]
    struct Beacon {
        mac: String,
    }

    #[derive(Debug, Default, PartialEq, Deserialize)]
    struct Readings {
        #[serde(default)]
        items: Vec<Beacon>,
        #[serde(default)]
        gateway: Option<String>,
    }

    impl MessageType for Readings {
        fn array_shape() -> Option<ArrayShape> {
            Some(<Self as ArrayMessage>::shape())
        }

        fn decode_tree(tree: &JsonTree) -> Result<Self, DecodeError> {
            decode_array_tolerant(tree)
        }
    }

    impl ArrayMessage for Readings {
        type Item = Beacon;
        const FIELD: &'static str = "items";

        fn from_items(items: Vec<Beacon>) -> Self {
            Self {
                items,
                ..Default::default()
            }
        }

        fn items(&self) -> &[Beacon] {
            &self.items
        }
    }

    #[derive(Debug, PartialEq, Deserialize)]
    struct Status {
        online: bool,
    }

    impl MessageType for Status {}

    fn beacon(mac: &str) -> Beacon {
        Beacon { mac: mac.to_string() }
    }

    fn tree(value: serde_json::Value) -> JsonTree {
        JsonTree::from_value(value)
    }

    #[test]
    fn test_plain_decode() {
        let status: Status = decode(&tree(json!({"online": true}))).unwrap();
        assert_eq!(status, Status { online: true });
    }

    #[test]
    fn test_plain_decode_malformed() {
        let error = decode::<Status>(&tree(json!({"online": "yes"}))).unwrap_err();
        assert!(error.is_malformed());
        assert_eq!(error.shape(), Some(JsonShape::Object));
    }

    #[test]
    fn test_plain_decode_missing_field_on_empty_payload() {
        let error = decode::<Status>(&JsonTree::empty()).unwrap_err();
        match error {
            DecodeError::Malformed { reason, .. } => assert!(reason.contains("online")),
            _ => panic!("Expected Malformed error"),
        }
    }

    #[test]
    fn test_array_payload() {
        let readings: Readings =
            decode(&tree(json!([{"mac": "AA:BB"}, {"mac": "CC:DD"}]))).unwrap();
        assert_eq!(readings.items(), &[beacon("AA:BB"), beacon("CC:DD")]);
        assert_eq!(readings.gateway, None);
    }

    #[test]
    fn test_empty_array_payload() {
        let readings: Readings = decode(&tree(json!([]))).unwrap();
        assert!(readings.items.is_empty());
    }

    #[test]
    fn test_single_object_payload() {
        let readings: Readings = decode(&tree(json!({"mac": "AA:BB"}))).unwrap();
        assert_eq!(readings.items, vec![beacon("AA:BB")]);
    }

    #[test]
    fn test_empty_payload_is_empty_collection() {
        let readings: Readings = decode(&JsonTree::parse(b"").unwrap()).unwrap();
        assert!(readings.items.is_empty());

        let readings: Readings = decode(&tree(json!({}))).unwrap();
        assert!(readings.items.is_empty());
    }

    #[test]
    fn test_pass_through_keeps_other_fields() {
        let readings: Readings = decode(&tree(json!({
            "items": [{"mac": "AA:BB"}],
            "gateway": "gw-1"
        })))
        .unwrap();

        assert_eq!(readings.items, vec![beacon("AA:BB")]);
        assert_eq!(readings.gateway.as_deref(), Some("gw-1"));
    }

    #[test]
    fn test_array_failures_are_collected_in_order() {
        let error = decode::<Readings>(&tree(json!([
            {"mac": "AA:BB"},
            {"rssi": -40},
            {"mac": "CC:DD"},
            {"mac": 7}
        ])))
        .unwrap_err();

        let indices: Vec<usize> = error.item_errors().iter().map(|e| e.index).collect();
        assert_eq!(indices, vec![1, 3]);
        assert_eq!(error.shape(), Some(JsonShape::Array));
        assert!(error.to_string().contains("2 of 4 items failed"));
    }

    #[test]
    fn test_single_object_failure() {
        let error = decode::<Readings>(&tree(json!({"rssi": -40}))).unwrap_err();
        assert!(error.is_malformed());
        assert_eq!(error.shape(), Some(JsonShape::Object));
        assert!(error.item_errors().is_empty());
    }

    #[test]
    fn test_scalar_failure_is_distinguishable() {
        let error = decode::<Readings>(&tree(json!("AA:BB"))).unwrap_err();
        assert_eq!(error.shape(), Some(JsonShape::Scalar));

        let error = decode::<Readings>(&tree(json!(42))).unwrap_err();
        assert_eq!(error.shape(), Some(JsonShape::Scalar));
    }

    #[test]
    fn test_wrapped_field_with_wrong_shape_reports_wrapped_error() {
        let error = decode::<Readings>(&tree(json!({"items": [1, 2]}))).unwrap_err();
        assert_eq!(error.shape(), Some(JsonShape::Object));
    }

    #[test]
    fn test_raw_value_passthrough() {
        let value: serde_json::Value = decode(&tree(json!([1, {"a": 2}]))).unwrap();
        assert_eq!(value, json!([1, {"a": 2}]));
    }
}
