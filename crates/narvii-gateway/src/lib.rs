//! # narvii-gateway
//!
//! Socket dispatch core: connection lifecycle with host failover and periodic
//! rotation, the handler registry, event dispatch, the pending-response
//! waiter, and the per-event execution context.

pub mod bot;
pub mod connection;
pub mod context;
pub mod dispatch;
pub mod handlers;
pub mod protocol;

pub use bot::Bot;
pub use connection::{Connection, ConnectionManager, ConnectionState};
pub use context::Context;
pub use dispatch::{DispatchReport, EventDispatcher, PendingResponses, SkipReason};
pub use handlers::{
    ArgKind, ArgSpec, ArgValue, ArgumentError, CommandArgs, CommandSpec, HandlerRegistry,
    KindFilter, RegistrationError,
};
pub use protocol::{OutgoingFrame, SignalAction, SignalPhase, SocketSignal};
