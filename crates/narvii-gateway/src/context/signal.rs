//! Scoped typing and recording indicators

use std::sync::Arc;

use crate::connection::Connection;
use crate::protocol::SocketSignal;

/// Keeps an indicator switched on until finished or dropped
///
/// The stop frame is sent exactly once: by [`SignalGuard::finish`], or from
/// `Drop` when the guard is abandoned (for example, when the enclosing future
/// is cancelled).
#[derive(Debug)]
pub struct SignalGuard {
    connection: Arc<Connection>,
    signal: SocketSignal,
    finished: bool,
}

impl SignalGuard {
    /// Send the start frame and return a guard for the stop frame
    ///
    /// A failed start is logged; the guard still sends the stop frame.
    pub async fn start(connection: Arc<Connection>, signal: SocketSignal) -> Self {
        if let Err(e) = connection.send(signal.start()).await {
            tracing::warn!(
                action = %signal.action,
                thread_id = %signal.thread_id,
                error = %e,
                "Failed to send start signal"
            );
        }
        Self {
            connection,
            signal,
            finished: false,
        }
    }

    #[must_use]
    pub fn signal(&self) -> &SocketSignal {
        &self.signal
    }

    /// Send the stop frame
    pub async fn finish(mut self) {
        self.finished = true;
        if let Err(e) = self.connection.send(self.signal.stop()).await {
            self.log_stop_failure(&e);
        }
    }

    fn log_stop_failure(&self, error: &narvii_common::BotError) {
        tracing::warn!(
            action = %self.signal.action,
            thread_id = %self.signal.thread_id,
            error = %error,
            "Failed to send stop signal"
        );
    }
}

impl Drop for SignalGuard {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        if let Err(e) = self.connection.try_send(self.signal.stop()) {
            self.log_stop_failure(&e);
        }
    }
}
