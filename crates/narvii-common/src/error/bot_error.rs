//! Bot error types
//!
//! Unified error handling for the dispatch core and its surroundings.

use std::time::Duration;

use narvii_core::{ApiError, FrameError};

use crate::auth::{SessionStoreError, SignatureError};
use crate::config::ConfigError;

/// Bot-wide error type
#[derive(Debug, thiserror::Error)]
pub enum BotError {
    // Connection errors
    /// Every candidate host refused the socket handshake
    #[error("Failed to connect to remote server: {0}")]
    Transport(String),

    /// An inbound frame could not be decoded
    #[error("Decode error: {0}")]
    Decode(#[from] FrameError),

    // Registration errors
    #[error("Registration error: {0}")]
    Registration(String),

    // Dispatch errors
    #[error("Argument error: {0}")]
    Argument(String),

    #[error("No matching frame within {0:?}")]
    Timeout(Duration),

    // Request gateway errors
    #[error(transparent)]
    Api(#[from] ApiError),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Signature error: {0}")]
    Signature(#[from] SignatureError),

    // Session persistence errors
    #[error("Session store error: {0}")]
    Session(#[from] SessionStoreError),

    // Internal errors
    #[error("Internal error")]
    Internal(#[source] anyhow::Error),
}

impl BotError {
    /// Whether the listen loop may continue after this error
    ///
    /// Decode failures skip one frame; transport failures end the current
    /// connection and are retried by the outer loop. Everything else stops `run`.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Decode(_))
    }

    /// Error code for logs
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Transport(_) => "TRANSPORT_ERROR",
            Self::Decode(_) => "DECODE_ERROR",
            Self::Registration(_) => "REGISTRATION_ERROR",
            Self::Argument(_) => "ARGUMENT_ERROR",
            Self::Timeout(_) => "TIMEOUT",
            Self::Api(e) => e.code(),
            Self::Config(_) => "CONFIG_ERROR",
            Self::Signature(_) => "SIGNATURE_ERROR",
            Self::Session(_) => "SESSION_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Create a transport error
    #[must_use]
    pub fn transport(msg: impl std::fmt::Display) -> Self {
        Self::Transport(msg.to_string())
    }

    /// Create an internal error from any error
    pub fn internal(err: impl Into<anyhow::Error>) -> Self {
        Self::Internal(err.into())
    }
}

/// Result type alias for bot operations
pub type BotResult<T> = Result<T, BotError>;
