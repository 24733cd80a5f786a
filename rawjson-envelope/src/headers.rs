//! Transport header bag
//!
//! Header names are matched ignoring ASCII case; the spelling of the first
//! insertion is kept. Insertion order is preserved for iteration.

use rawjson_core::acceptance::MESSAGE_TYPE_SEPARATOR;

/// `Content-Type` header
pub const CONTENT_TYPE: &str = "Content-Type";
/// `Content-Encoding` header, naming the payload charset
pub const CONTENT_ENCODING: &str = "Content-Encoding";
/// Sender-assigned message identifier
pub const MESSAGE_ID: &str = "MessageId";
/// Sender-declared message type URNs, `;`-separated
pub const MESSAGE_TYPE: &str = "MessageType";

/// Case-insensitive header bag
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    /// Create an empty header bag
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a header, replacing any value stored under the same name
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();

        match self
            .entries
            .iter_mut()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(&name))
        {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Builder-style [`insert`](Self::insert)
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    /// Look up a header
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Remove a header, returning its value
    pub fn remove(&mut self, name: &str) -> Option<String> {
        let position = self
            .entries
            .iter()
            .position(|(existing, _)| existing.eq_ignore_ascii_case(name))?;
        Some(self.entries.remove(position).1)
    }

    /// True if the header is present
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Iterate `(name, value)` pairs in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Number of headers
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no headers are set
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Non-blank `MessageId`, trimmed
    pub fn message_id(&self) -> Option<&str> {
        self.get(MESSAGE_ID).map(str::trim).filter(|id| !id.is_empty())
    }

    /// Declared message type URNs from `MessageType`
    pub fn message_types(&self) -> Vec<String> {
        self.get(MESSAGE_TYPE)
            .map(|value| {
                value
                    .split(MESSAGE_TYPE_SEPARATOR)
                    .map(str::trim)
                    .filter(|urn| !urn.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Non-blank `Content-Encoding`, trimmed
    pub fn content_encoding(&self) -> Option<&str> {
        self.get(CONTENT_ENCODING).map(str::trim).filter(|e| !e.is_empty())
    }

    /// `Content-Type`, if set
    pub fn content_type(&self) -> Option<&str> {
        self.get(CONTENT_TYPE)
    }
}

impl<N, V> FromIterator<(N, V)> for Headers
where
    N: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (name, value) in iter {
            headers.insert(name, value);
        }
        headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_insensitive_lookup() {
        let headers = Headers::new().with("content-type", "application/json");
        assert_eq!(headers.get(CONTENT_TYPE), Some("application/json"));
        assert_eq!(headers.content_type(), Some("application/json"));
        assert!(headers.contains("CONTENT-TYPE"));
    }

    #[test]
    fn test_insert_replaces() {
        let mut headers = Headers::new();
        headers.insert("MessageId", "a");
        headers.insert("messageid", "b");

        assert_eq!(headers.len(), 1);
        assert_eq!(headers.message_id(), Some("b"));
        assert_eq!(headers.iter().next(), Some(("MessageId", "b")));
    }

    #[test]
    fn test_remove() {
        let mut headers: Headers = [("A", "1"), ("B", "2")].into_iter().collect();
        assert_eq!(headers.remove("a"), Some("1".to_string()));
        assert_eq!(headers.remove("a"), None);
        assert_eq!(headers.len(), 1);
    }

    #[test]
    fn test_message_types() {
        let headers = Headers::new().with(MESSAGE_TYPE, "urn:message:A; urn:message:B ;");
        assert_eq!(headers.message_types(), vec!["urn:message:A", "urn:message:B"]);
        assert!(Headers::new().message_types().is_empty());
    }

    #[test]
    fn test_blank_values_are_absent() {
        let headers = Headers::new()
            .with(MESSAGE_ID, "   ")
            .with(CONTENT_ENCODING, "");
        assert_eq!(headers.message_id(), None);
        assert_eq!(headers.content_encoding(), None);
        assert!(!headers.is_empty());
    }
}
