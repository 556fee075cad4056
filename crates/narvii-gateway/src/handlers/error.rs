//! Handler error types

use narvii_common::BotError;
use thiserror::Error;

/// Registration-time errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistrationError {
    /// The prefixed command is already registered
    #[error("Command already registered: {0}")]
    DuplicateCommand(String),

    /// A command spec named no commands
    #[error("Command spec has no commands")]
    NoCommands,

    /// A command normalized to the empty string
    #[error("Command is empty after prefixing")]
    EmptyCommand,
}

/// Per-event argument errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ArgumentError {
    /// The message had fewer words than declared arguments
    #[error("Missing argument `{name}`")]
    Missing { name: String },

    /// A word could not be coerced to the declared type
    #[error("Invalid value {value:?} for argument `{name}`: {reason}")]
    Invalid {
        name: String,
        value: String,
        reason: String,
    },

    /// A handler asked for an argument that was never declared
    #[error("Unknown argument `{0}`")]
    Unknown(String),

    /// A handler read an argument as the wrong type
    #[error("Argument `{name}` is not {expected}")]
    WrongType { name: String, expected: &'static str },
}

impl ArgumentError {
    /// Whether the message simply had too few words
    #[must_use]
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing { .. })
    }
}

impl From<RegistrationError> for BotError {
    fn from(err: RegistrationError) -> Self {
        Self::Registration(err.to_string())
    }
}

impl From<ArgumentError> for BotError {
    fn from(err: ArgumentError) -> Self {
        Self::Argument(err.to_string())
    }
}

/// Registration result type
pub type RegistrationResult<T> = Result<T, RegistrationError>;
