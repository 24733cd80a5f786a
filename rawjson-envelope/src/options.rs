//! Serializer options shared by the inbound and outbound sides

/// Options for raw JSON (de)serialization
///
/// # Examples
///
/// ```rust
/// use rawjson_envelope::RawOptions;
///
/// let options = RawOptions::new()
///     .with_any_message_type(true)
///     .with_transport_headers(true);
/// assert!(options.any_message_type);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawOptions {
    /// Accept every message type regardless of the sender's declaration
    pub any_message_type: bool,

    /// Stamp the `MessageType` header on outbound messages
    pub add_transport_headers: bool,
}

impl RawOptions {
    /// Options with every flag off
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable "accept any" mode
    pub fn with_any_message_type(mut self, enable: bool) -> Self {
        self.any_message_type = enable;
        self
    }

    /// Enable or disable outbound transport headers
    pub fn with_transport_headers(mut self, enable: bool) -> Self {
        self.add_transport_headers = enable;
        self
    }
}
