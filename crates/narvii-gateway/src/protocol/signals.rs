//! Typing and recording indicators
//!
//! Indicators are socket frames, not REST calls. A start frame (`t = 304`)
//! switches the indicator on for a thread and a stop frame (`t = 306`)
//! switches it off.

use rand::Rng;
use serde_json::json;

use super::OutgoingFrame;

/// Indicator shown to other thread members
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalAction {
    Typing,
    Recording,
}

impl SignalAction {
    /// Action name on the wire
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Typing => "Typing",
            Self::Recording => "Recording",
        }
    }
}

impl std::fmt::Display for SignalAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Whether a signal switches the indicator on or off
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i64)]
pub enum SignalPhase {
    Start = 304,
    Stop = 306,
}

impl SignalPhase {
    /// Frame kind
    #[must_use]
    pub const fn as_i64(self) -> i64 {
        self as i64
    }
}

/// Indicator addressed to one thread
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocketSignal {
    pub action: SignalAction,
    pub community_id: i64,
    pub thread_id: String,
    /// Client-chosen request id, shared by the start and stop frames
    pub id: String,
}

impl SocketSignal {
    /// Create a signal with a random request id
    pub fn new(action: SignalAction, community_id: i64, thread_id: impl Into<String>) -> Self {
        Self {
            action,
            community_id,
            thread_id: thread_id.into(),
            id: rand::thread_rng().gen_range(1_000_000..10_000_000).to_string(),
        }
    }

    /// Target descriptor, `ndc://x{community}/chat-thread/{thread}`
    #[must_use]
    pub fn target(&self) -> String {
        format!(
            "ndc://x{}/chat-thread/{}",
            self.community_id, self.thread_id
        )
    }

    /// Frame for the given phase
    #[must_use]
    pub fn frame(&self, phase: SignalPhase) -> OutgoingFrame {
        OutgoingFrame::new(
            phase.as_i64(),
            json!({
                "actions": [self.action.name()],
                "target": self.target(),
                "ndcId": self.community_id,
                "params": { "threadType": 2 },
                "id": self.id,
            }),
        )
    }

    #[must_use]
    pub fn start(&self) -> OutgoingFrame {
        self.frame(SignalPhase::Start)
    }

    #[must_use]
    pub fn stop(&self) -> OutgoingFrame {
        self.frame(SignalPhase::Stop)
    }
}
