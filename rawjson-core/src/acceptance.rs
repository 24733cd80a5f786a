//! Message-type acceptance filter
//!
//! Before decoding a type from an envelope, the envelope's acceptance
//! declaration decides whether the type may be attempted at all. Rejected
//! types never touch the parsed tree.
//!
//! # Rules
//!
//! - "Accept any" mode: every type is accepted
//! - No declared types: every type is accepted (the sender did not restrict)
//! - Otherwise: the type's URN must equal one declared entry, ignoring ASCII case
//!
//! The raw JSON value is always accepted.
//!
//! # Examples
//!
//! ```rust
//! use rawjson_core::Acceptance;
//!
//! let acceptance = Acceptance::from_header("urn:message:Widget; urn:message:Gizmo");
//! assert!(acceptance.accepts_urn("URN:MESSAGE:WIDGET"));
//! assert!(!acceptance.accepts_urn("urn:message:Gadget"));
//!
//! assert!(Acceptance::default().accepts_urn("anything"));
//! ```

use crate::message::TargetDescriptor;

/// Separator between URNs in a `MessageType` header value
pub const MESSAGE_TYPE_SEPARATOR: char = ';';

/// The set of message types a sender declared for one envelope
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Acceptance {
    any: bool,
    declared: Vec<String>,
}

impl Acceptance {
    /// Accept every type
    pub fn any() -> Self {
        Self {
            any: true,
            declared: Vec::new(),
        }
    }

    /// Accept only the declared types (or everything, if none are declared)
    pub fn declared<I, S>(types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            any: false,
            declared: types
                .into_iter()
                .map(Into::into)
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect(),
        }
    }

    /// Parse a `;`-separated header value
    pub fn from_header(value: &str) -> Self {
        Self::declared(value.split(MESSAGE_TYPE_SEPARATOR))
    }

    /// Turn "accept any" mode on or off
    pub fn with_any_message_type(mut self, any: bool) -> Self {
        self.any = any;
        self
    }

    /// True in "accept any" mode
    pub fn is_any(&self) -> bool {
        self.any
    }

    /// The declared type identifiers, in sender order
    pub fn declared_types(&self) -> &[String] {
        &self.declared
    }

    /// Decide whether a type may be decoded
    pub fn accepts(&self, target: &TargetDescriptor) -> bool {
        target.is_raw_tree() || self.accepts_urn(target.urn())
    }

    /// Decide by canonical type identifier
    pub fn accepts_urn(&self, urn: &str) -> bool {
        self.any
            || self.declared.is_empty()
            || self.declared.iter().any(|declared| declared.eq_ignore_ascii_case(urn))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::MessageType;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Widget {}

    impl MessageType for Widget {
        fn message_urn() -> String {
            "Widget".to_string()
        }
    }

    #[derive(Deserialize)]
    struct Gadget {}

    impl MessageType for Gadget {
        fn message_urn() -> String {
            "Gadget".to_string()
        }
    }

    #[test]
    fn test_declared_match() {
        let acceptance = Acceptance::declared(["Widget"]);
        assert!(acceptance.accepts(&TargetDescriptor::of::<Widget>()));
        assert!(!acceptance.accepts(&TargetDescriptor::of::<Gadget>()));
    }

    #[test]
    fn test_match_ignores_case() {
        let acceptance = Acceptance::declared(["wIdGeT"]);
        assert!(acceptance.accepts(&TargetDescriptor::of::<Widget>()));
    }

    #[test]
    fn test_empty_declaration_accepts_everything() {
        let acceptance = Acceptance::declared(Vec::<String>::new());
        assert!(acceptance.accepts(&TargetDescriptor::of::<Gadget>()));
        assert!(Acceptance::from_header(" ; ").declared_types().is_empty());
    }

    #[test]
    fn test_any_mode_overrides_declaration() {
        let acceptance = Acceptance::declared(["Widget"]).with_any_message_type(true);
        assert!(acceptance.is_any());
        assert!(acceptance.accepts(&TargetDescriptor::of::<Gadget>()));
        assert!(Acceptance::any().accepts_urn("urn:message:Anything"));
    }

    #[test]
    fn test_raw_tree_always_accepted() {
        let acceptance = Acceptance::declared(["Widget"]);
        assert!(acceptance.accepts(&TargetDescriptor::of::<serde_json::Value>()));
    }

    #[test]
    fn test_from_header_trims_entries() {
        let acceptance = Acceptance::from_header("urn:message:A ;urn:message:B;;");
        assert_eq!(
            acceptance.declared_types(),
            &["urn:message:A".to_string(), "urn:message:B".to_string()]
        );
    }
}
