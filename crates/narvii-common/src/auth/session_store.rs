//! Session persistence
//!
//! Sessions survive restarts in a small `key=value` file holding the token,
//! account id, the credentials it was issued for, and the issuance time.
//! A stored session is only reused for the same credentials and while fresh.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use narvii_core::Session;

/// File-backed session cache
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Restore a session issued for `email`/`password` that is younger than `ttl`
    ///
    /// Returns `Ok(None)` when there is nothing reusable on disk.
    pub fn load(
        &self,
        email: &str,
        password: &str,
        ttl: Duration,
    ) -> Result<Option<Session>, SessionStoreError> {
        let entries = match dotenvy::from_path_iter(&self.path) {
            Ok(entries) => entries,
            Err(e) if e.not_found() => return Ok(None),
            Err(e) => return Err(SessionStoreError::Parse(e.to_string())),
        };

        let mut stored = StoredSession::default();
        for entry in entries {
            let (key, value) = entry.map_err(|e| SessionStoreError::Parse(e.to_string()))?;
            match key.as_str() {
                "sid" => stored.sid = Some(value),
                "uid" => stored.uid = Some(value),
                "email" => stored.email = Some(value),
                "password" => stored.password = Some(value),
                "timestamp" => stored.timestamp = value.parse().ok(),
                _ => {}
            }
        }

        if stored.email.as_deref() != Some(email) || stored.password.as_deref() != Some(password) {
            tracing::debug!(path = %self.path.display(), "Stored session belongs to other credentials");
            return Ok(None);
        }

        let (Some(sid), Some(uid), Some(timestamp)) = (stored.sid, stored.uid, stored.timestamp)
        else {
            return Ok(None);
        };
        if sid.is_empty() || uid.is_empty() {
            return Ok(None);
        }

        let Some(issued_at) = DateTime::<Utc>::from_timestamp(timestamp, 0) else {
            return Ok(None);
        };
        let session = Session::issued_at(sid, uid, issued_at);

        if !session.is_fresh_at(Utc::now(), ttl) {
            tracing::info!(
                issued_at = %session.issued_at,
                "Stored session expired, a new login is required"
            );
            return Ok(None);
        }

        Ok(Some(session))
    }

    /// Persist `session` for `email`/`password`, replacing the file
    pub fn save(
        &self,
        email: &str,
        password: &str,
        session: &Session,
    ) -> Result<(), SessionStoreError> {
        let timestamp = session.issued_at.timestamp().to_string();
        let contents: String = [
            ("sid", session.token.as_str()),
            ("uid", session.user_id.as_str()),
            ("email", email),
            ("password", password),
            ("timestamp", timestamp.as_str()),
        ]
        .iter()
        .map(|(key, value)| format!("{key}={}\n", quote(value)))
        .collect();

        fs::write(&self.path, contents)?;

        tracing::debug!(path = %self.path.display(), "Session persisted");

        Ok(())
    }
}

/// Single-quote `value` so it is read back verbatim
///
/// Quoted values skip `$` expansion and `#` comments; an embedded `'` closes
/// the quote, emits an escaped quote, and reopens it.
fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

#[derive(Default)]
struct StoredSession {
    sid: Option<String>,
    uid: Option<String>,
    email: Option<String>,
    password: Option<String>,
    timestamp: Option<i64>,
}

/// Session persistence errors
#[derive(Debug, thiserror::Error)]
pub enum SessionStoreError {
    #[error("Session file I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("Session file is malformed: {0}")]
    Parse(String),
}
