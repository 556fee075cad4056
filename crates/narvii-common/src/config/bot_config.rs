//! Bot configuration
//!
//! Loads configuration from environment variables (and a `.env` file if present).

use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use narvii_core::SESSION_TTL_HOURS;

use crate::auth::{DEFAULT_SIGNATURE_KEY, DEFAULT_SIGNATURE_PREFIX};

/// Device id used when none is configured
pub const DEFAULT_DEVICE_ID: &str =
    "327766716D73766C776A6F767078766740676D61696C2E636F6D5DA1DCD8E8E7C6BDDEFD7128E05113FFE25F6239";

/// Main bot configuration
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub env: Environment,
    pub credentials: Credentials,
    /// Default command prefix, already lowercased
    pub prefix: String,
    pub device_id: String,
    /// Proxy URL for REST calls
    pub proxy: Option<String>,
    pub api_base: String,
    pub socket: SocketConfig,
    pub session_ttl_hours: i64,
    pub session_file: PathBuf,
    /// How long shutdown waits for running handler tasks
    pub shutdown_grace: Duration,
    pub signature_key: Vec<u8>,
    pub signature_prefix: u8,
}

/// Environment type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    #[must_use]
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    #[must_use]
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }
}

/// Login credentials
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Socket connection settings
#[derive(Debug, Clone)]
pub struct SocketConfig {
    /// Candidate endpoints, tried in order
    pub hosts: Vec<String>,
    /// Proactive reconnect interval
    pub rotate_interval: Duration,
    /// Delay before retrying after every host failed
    pub reconnect_delay: Duration,
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self {
            hosts: default_hosts(),
            rotate_interval: Duration::from_secs(default_rotate_secs()),
            reconnect_delay: Duration::from_millis(default_reconnect_delay_ms()),
        }
    }
}

// Default value functions
fn default_hosts() -> Vec<String> {
    (1..=4)
        .rev()
        .map(|i| format!("wss://ws{i}.narvii.com"))
        .collect()
}

fn default_api_base() -> String {
    "https://service.narvii.com/api/v1".to_string()
}

fn default_rotate_secs() -> u64 {
    180
}

fn default_reconnect_delay_ms() -> u64 {
    1000
}

fn default_session_file() -> PathBuf {
    PathBuf::from(".narvii-session")
}

fn default_shutdown_grace_secs() -> u64 {
    5
}

impl BotConfig {
    /// Configuration with every optional setting at its default
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            env: Environment::default(),
            credentials: Credentials {
                email: email.into(),
                password: password.into(),
            },
            prefix: String::new(),
            device_id: DEFAULT_DEVICE_ID.to_string(),
            proxy: None,
            api_base: default_api_base(),
            socket: SocketConfig::default(),
            session_ttl_hours: SESSION_TTL_HOURS,
            session_file: default_session_file(),
            shutdown_grace: Duration::from_secs(default_shutdown_grace_secs()),
            signature_key: DEFAULT_SIGNATURE_KEY.to_vec(),
            signature_prefix: DEFAULT_SIGNATURE_PREFIX,
        }
    }

    /// Set the default command prefix
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into().to_lowercase();
        self
    }

    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error if required environment variables are missing or malformed
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let email = lookup("NARVII_EMAIL").ok_or(ConfigError::MissingVar("NARVII_EMAIL"))?;
        let password =
            lookup("NARVII_PASSWORD").ok_or(ConfigError::MissingVar("NARVII_PASSWORD"))?;

        let mut config = Self::new(email, password);

        config.env = lookup("APP_ENV")
            .and_then(|s| match s.to_lowercase().as_str() {
                "production" => Some(Environment::Production),
                "staging" => Some(Environment::Staging),
                "development" => Some(Environment::Development),
                _ => None,
            })
            .unwrap_or_default();

        if let Some(prefix) = lookup("NARVII_PREFIX") {
            config = config.with_prefix(prefix);
        }
        if let Some(device_id) = lookup("NARVII_DEVICE_ID") {
            config.device_id = device_id;
        }
        config.proxy = lookup("NARVII_PROXY").filter(|s| !s.is_empty());
        if let Some(api_base) = lookup("NARVII_API_BASE") {
            config.api_base = api_base.trim_end_matches('/').to_string();
        }
        if let Some(hosts) = lookup("NARVII_WS_HOSTS") {
            let hosts: Vec<String> = hosts
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
            if hosts.is_empty() {
                return Err(ConfigError::InvalidValue(
                    "NARVII_WS_HOSTS",
                    "no hosts given".to_string(),
                ));
            }
            config.socket.hosts = hosts;
        }

        config.socket.rotate_interval = Duration::from_secs(parse_var(
            &lookup,
            "NARVII_ROTATE_SECS",
            default_rotate_secs(),
        )?);
        config.socket.reconnect_delay = Duration::from_millis(parse_var(
            &lookup,
            "NARVII_RECONNECT_DELAY_MS",
            default_reconnect_delay_ms(),
        )?);
        config.session_ttl_hours = parse_var(&lookup, "NARVII_SESSION_TTL_HOURS", SESSION_TTL_HOURS)?;
        config.shutdown_grace = Duration::from_secs(parse_var(
            &lookup,
            "NARVII_SHUTDOWN_GRACE_SECS",
            default_shutdown_grace_secs(),
        )?);
        if let Some(path) = lookup("NARVII_SESSION_FILE") {
            config.session_file = PathBuf::from(path);
        }

        if let Some(key) = lookup("NARVII_SIGNATURE_KEY") {
            config.signature_key = hex::decode(key.trim())
                .map_err(|e| ConfigError::InvalidValue("NARVII_SIGNATURE_KEY", e.to_string()))?;
        }
        if let Some(prefix) = lookup("NARVII_SIGNATURE_PREFIX") {
            config.signature_prefix =
                u8::from_str_radix(prefix.trim().trim_start_matches("0x"), 16).map_err(|e| {
                    ConfigError::InvalidValue("NARVII_SIGNATURE_PREFIX", e.to_string())
                })?;
        }

        Ok(config)
    }

    /// Session freshness window
    #[must_use]
    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.session_ttl_hours)
    }
}

fn parse_var<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: fmt::Display,
{
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidValue(name, e.to_string())),
        None => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}
