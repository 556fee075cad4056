//! Per-event execution context

mod context;
mod signal;

pub use context::Context;
pub use signal::SignalGuard;
