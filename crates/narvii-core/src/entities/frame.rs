//! Inbound socket frames
//!
//! Every server push is a JSON object `{"t": <kind>, "o": <payload>}`.
//! Only chat messages are interpreted structurally; every other kind is
//! carried as an opaque payload.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::error::FrameError;

/// Frame discriminator (`t` on the wire)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FrameKind(pub i64);

impl FrameKind {
    /// A chat message was posted to a thread the account can see
    pub const CHAT_MESSAGE: Self = Self(1000);

    /// Raw wire value
    #[must_use]
    pub const fn as_i64(self) -> i64 {
        self.0
    }

    /// Whether frames of this kind are dispatched to chat handlers
    #[must_use]
    pub const fn is_chat_message(self) -> bool {
        self.0 == Self::CHAT_MESSAGE.0
    }
}

impl fmt::Display for FrameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One decoded inbound WebSocket message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SocketFrame {
    /// Frame kind
    pub t: FrameKind,

    /// Kind-specific payload
    #[serde(default)]
    pub o: Value,
}

impl SocketFrame {
    /// Build a frame from its parts
    pub fn new(kind: FrameKind, payload: Value) -> Self {
        Self { t: kind, o: payload }
    }

    /// Decode a frame from raw socket text
    pub fn from_json(text: &str) -> Result<Self, FrameError> {
        serde_json::from_str(text).map_err(FrameError::from)
    }

    /// Frame kind
    #[must_use]
    pub fn kind(&self) -> FrameKind {
        self.t
    }

    /// Payload
    #[must_use]
    pub fn payload(&self) -> &Value {
        &self.o
    }

    /// Community id carried by the payload, if any
    #[must_use]
    pub fn community_id(&self) -> Option<i64> {
        self.o.get("ndcId").and_then(Value::as_i64)
    }

    /// Thread id carried by the payload or its chat message, if any
    #[must_use]
    pub fn thread_id(&self) -> Option<&str> {
        self.o
            .get("threadId")
            .or_else(|| self.o.get("chatMessage").and_then(|m| m.get("threadId")))
            .and_then(Value::as_str)
    }
}

impl fmt::Display for SocketFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SocketFrame(t={})", self.t)
    }
}
