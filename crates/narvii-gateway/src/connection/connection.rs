//! Live connection handle
//!
//! A `Connection` outlives individual sockets: rotation swaps the sender
//! underneath it, so contexts created before a rotation keep writing to the
//! current socket.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use narvii_common::{BotError, BotResult};
use parking_lot::RwLock;
use tokio::sync::mpsc;

use crate::protocol::OutgoingFrame;

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Handshaking with the candidate hosts
    Connecting,
    /// Receiving frames
    Listening,
    /// Replacing the socket after the rotation interval
    Rotating,
    /// Shut down
    Closed,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Connecting => "connecting",
            Self::Listening => "listening",
            Self::Rotating => "rotating",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// The socket currently attached to the handle
struct Attached {
    session_id: String,
    host: String,
    sender: mpsc::Sender<OutgoingFrame>,
}

/// Shared handle to whichever socket is live
pub struct Connection {
    attached: RwLock<Option<Attached>>,
    state: RwLock<ConnectionState>,
    /// Number of sockets attached so far
    generation: AtomicU64,
}

impl Connection {
    /// Create a detached handle
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            attached: RwLock::new(None),
            state: RwLock::new(ConnectionState::Connecting),
            generation: AtomicU64::new(0),
        })
    }

    /// Get the current state
    pub fn state(&self) -> ConnectionState {
        *self.state.read()
    }

    /// Set the connection state
    pub fn set_state(&self, state: ConnectionState) {
        *self.state.write() = state;
    }

    /// Attach a freshly opened socket
    pub fn attach(
        &self,
        session_id: impl Into<String>,
        host: impl Into<String>,
        sender: mpsc::Sender<OutgoingFrame>,
    ) {
        *self.attached.write() = Some(Attached {
            session_id: session_id.into(),
            host: host.into(),
            sender,
        });
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.set_state(ConnectionState::Listening);
    }

    /// Drop the current socket's sender, letting its writer close the socket
    pub fn detach(&self) {
        self.attached.write().take();
    }

    /// Detach and mark closed
    pub fn close(&self) {
        self.detach();
        self.set_state(ConnectionState::Closed);
    }

    /// Id of the attached socket
    pub fn session_id(&self) -> Option<String> {
        self.attached.read().as_ref().map(|a| a.session_id.clone())
    }

    /// Host the attached socket is connected to
    pub fn host(&self) -> Option<String> {
        self.attached.read().as_ref().map(|a| a.host.clone())
    }

    /// Number of sockets attached since creation
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Whether a socket is attached and its writer is alive
    pub fn is_open(&self) -> bool {
        self.attached
            .read()
            .as_ref()
            .is_some_and(|a| !a.sender.is_closed())
    }

    fn sender(&self) -> BotResult<mpsc::Sender<OutgoingFrame>> {
        self.attached
            .read()
            .as_ref()
            .map(|a| a.sender.clone())
            .ok_or_else(|| BotError::transport("no socket attached"))
    }

    /// Send a frame on the live socket
    pub async fn send(&self, frame: OutgoingFrame) -> BotResult<()> {
        self.sender()?
            .send(frame)
            .await
            .map_err(|_| BotError::transport("socket writer closed"))
    }

    /// Try to send a frame (non-blocking)
    pub fn try_send(&self, frame: OutgoingFrame) -> BotResult<()> {
        self.sender()?
            .try_send(frame)
            .map_err(|e| BotError::transport(format!("socket writer unavailable: {e}")))
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("session_id", &self.session_id())
            .field("state", &self.state())
            .field("generation", &self.generation())
            .finish()
    }
}
