//! Event dispatch
//!
//! Classifies inbound frames, feeds the pending-response waiter, and
//! schedules matching handlers.

mod dispatcher;
mod waiter;

pub use dispatcher::{DispatchReport, EventDispatcher, SkipReason};
pub use waiter::PendingResponses;
