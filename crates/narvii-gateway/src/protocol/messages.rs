//! Outgoing socket frames

use serde::Serialize;
use serde_json::Value;

/// A frame written to the socket: `{"t": <kind>, "o": <payload>}`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutgoingFrame {
    /// Frame kind
    pub t: i64,
    /// Payload
    pub o: Value,
}

impl OutgoingFrame {
    /// Create a frame
    #[must_use]
    pub fn new(kind: i64, payload: Value) -> Self {
        Self { t: kind, o: payload }
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
