//! # narvii-common
//!
//! Shared utilities including configuration, error handling, request signing,
//! session persistence, and telemetry.

pub mod auth;
pub mod config;
pub mod error;
pub mod telemetry;

// Re-export commonly used types at crate root
pub use auth::{SessionStore, SessionStoreError, SignatureError, Signer};
pub use config::{BotConfig, ConfigError, Credentials, Environment, SocketConfig};
pub use error::{BotError, BotResult};
pub use telemetry::{
    init_tracing, init_tracing_with_config, try_init_tracing, try_init_tracing_with_config,
    TracingConfig, TracingError,
};
