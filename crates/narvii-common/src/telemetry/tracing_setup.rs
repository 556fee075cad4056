//! Tracing setup
//!
//! One subscriber per process. `RUST_LOG` wins over the preset when set.

use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use crate::config::Environment;

/// Transport crates that are chatty at `debug`
const QUIET_DEPENDENCIES: &[&str] = &[
    "tungstenite=warn",
    "tokio_tungstenite=warn",
    "hyper=warn",
    "reqwest=warn",
];

/// Subscriber options
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Level for the bot's own crates
    pub level: Level,
    /// Emit one JSON object per event
    pub json: bool,
    /// Log span open/close
    pub span_events: bool,
    /// Include source file and line
    pub file_line: bool,
    /// Log every inbound frame (`narvii_gateway=trace`)
    pub frame_trace: bool,
    /// Extra `EnvFilter` directives, appended last
    pub directives: Vec<String>,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            json: false,
            span_events: false,
            file_line: false,
            frame_trace: false,
            directives: Vec::new(),
        }
    }
}

impl TracingConfig {
    /// Debug output with source locations
    #[must_use]
    pub fn development() -> Self {
        Self {
            level: Level::DEBUG,
            span_events: true,
            file_line: true,
            ..Self::default()
        }
    }

    /// JSON output at info
    #[must_use]
    pub fn production() -> Self {
        Self {
            json: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn for_environment(env: Environment) -> Self {
        match env {
            Environment::Production => Self::production(),
            Environment::Staging => Self::default(),
            Environment::Development => Self::development(),
        }
    }

    /// Add an `EnvFilter` directive such as `narvii_api=trace`
    #[must_use]
    pub fn directive(mut self, directive: impl Into<String>) -> Self {
        self.directives.push(directive.into());
        self
    }

    /// Filter string used when `RUST_LOG` is unset
    #[must_use]
    pub fn filter(&self) -> String {
        let mut parts = vec![self.level.to_string().to_lowercase()];
        parts.extend(QUIET_DEPENDENCIES.iter().map(ToString::to_string));
        if self.frame_trace {
            parts.push("narvii_gateway=trace".to_string());
        }
        parts.extend(self.directives.iter().cloned());
        parts.join(",")
    }

    fn span_events(&self) -> FmtSpan {
        if self.span_events {
            FmtSpan::NEW | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        }
    }
}

/// Install the default subscriber
///
/// # Panics
/// Panics if a global subscriber is already installed.
pub fn init_tracing() {
    init_tracing_with_config(TracingConfig::default());
}

/// Install a subscriber for `config`
///
/// # Panics
/// Panics if a global subscriber is already installed.
pub fn init_tracing_with_config(config: TracingConfig) {
    if let Err(e) = try_init_tracing_with_config(config) {
        panic!("{e}");
    }
}

pub fn try_init_tracing() -> Result<(), TracingError> {
    try_init_tracing_with_config(TracingConfig::default())
}

/// Install a subscriber for `config`, failing if one is already installed
pub fn try_init_tracing_with_config(config: TracingConfig) -> Result<(), TracingError> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(config.filter())
            .map_err(|e| TracingError::InvalidFilter(e.to_string()))?,
    };

    let json = config.json.then(|| {
        fmt::layer()
            .json()
            .with_file(config.file_line)
            .with_line_number(config.file_line)
            .with_span_events(config.span_events())
    });
    let plain = (!config.json).then(|| {
        fmt::layer()
            .with_file(config.file_line)
            .with_line_number(config.file_line)
            .with_span_events(config.span_events())
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json)
        .with(plain)
        .try_init()
        .map_err(|_| TracingError::AlreadyInitialized)
}

#[derive(Debug, thiserror::Error)]
pub enum TracingError {
    #[error("Tracing subscriber already initialized")]
    AlreadyInitialized,

    #[error("Invalid log filter: {0}")]
    InvalidFilter(String),
}
