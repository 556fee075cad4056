//! Pending-response waiter
//!
//! Callers block until a frame satisfying their predicate arrives. Every
//! inbound frame is offered to every outstanding wait in registration order,
//! so one frame may fulfill several waits.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use narvii_common::{BotError, BotResult};
use narvii_core::SocketFrame;
use parking_lot::Mutex;
use tokio::sync::oneshot;

type Predicate = Box<dyn Fn(&SocketFrame) -> bool + Send + Sync>;

struct PendingWait {
    id: u64,
    predicate: Predicate,
    sender: oneshot::Sender<SocketFrame>,
}

/// Outstanding waits for future frames
#[derive(Default)]
pub struct PendingResponses {
    next_id: AtomicU64,
    waits: Mutex<Vec<PendingWait>>,
}

/// Removes a wait's slot when the waiting future finishes or is dropped
struct SlotGuard<'a> {
    waiter: &'a PendingResponses,
    id: u64,
}

impl Drop for SlotGuard<'_> {
    fn drop(&mut self) {
        self.waiter.remove(self.id);
    }
}

impl PendingResponses {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of outstanding waits
    #[must_use]
    pub fn pending(&self) -> usize {
        self.waits.lock().len()
    }

    fn register(&self, predicate: Predicate) -> (u64, oneshot::Receiver<SocketFrame>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = oneshot::channel();
        self.waits.lock().push(PendingWait {
            id,
            predicate,
            sender,
        });
        (id, receiver)
    }

    fn remove(&self, id: u64) {
        self.waits.lock().retain(|wait| wait.id != id);
    }

    /// Offer a frame to every outstanding wait
    ///
    /// Matching waits are fulfilled and removed. Returns how many were
    /// fulfilled.
    pub fn offer(&self, frame: &SocketFrame) -> usize {
        let mut waits = self.waits.lock();
        let mut fulfilled = 0;
        let mut index = 0;

        while index < waits.len() {
            let wait = &waits[index];
            if wait.sender.is_closed() {
                waits.remove(index);
                continue;
            }
            if (wait.predicate)(frame) {
                let wait = waits.remove(index);
                if wait.sender.send(frame.clone()).is_ok() {
                    fulfilled += 1;
                }
                continue;
            }
            index += 1;
        }

        fulfilled
    }

    /// Wait for the first frame satisfying `predicate`
    ///
    /// With a timeout, the wait is abandoned and its slot removed once the
    /// timeout elapses. Dropping the returned future also removes the slot.
    ///
    /// # Errors
    /// Returns `BotError::Timeout` if no matching frame arrives in time
    pub async fn wait_for<P>(&self, predicate: P, timeout: Option<Duration>) -> BotResult<SocketFrame>
    where
        P: Fn(&SocketFrame) -> bool + Send + Sync + 'static,
    {
        let (id, receiver) = self.register(Box::new(predicate));
        let _guard = SlotGuard { waiter: self, id };

        let received = match timeout {
            Some(limit) => tokio::time::timeout(limit, receiver)
                .await
                .map_err(|_| BotError::Timeout(limit))?,
            None => receiver.await,
        };

        received.map_err(|_| BotError::internal(anyhow::anyhow!("pending wait dropped")))
    }

    /// Abandon every outstanding wait
    pub fn clear(&self) {
        self.waits.lock().clear();
    }
}

impl std::fmt::Debug for PendingResponses {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingResponses")
            .field("pending", &self.pending())
            .finish()
    }
}
