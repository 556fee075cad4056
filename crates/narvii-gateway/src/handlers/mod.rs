//! Handler registration
//!
//! Event handlers, command handlers with declarative argument specs, and the
//! lifecycle slots.

mod args;
mod error;
mod registry;

pub use args::{parse_arguments, ArgKind, ArgSpec, ArgValue, CommandArgs};
pub use error::{ArgumentError, RegistrationError, RegistrationResult};
pub use registry::{
    BackgroundCallback, BackgroundTask, CommandCallback, CommandHandler, CommandSpec,
    EventCallback, EventHandler, HandlerFuture, HandlerRegistry, KindFilter, ReadyCallback,
};
