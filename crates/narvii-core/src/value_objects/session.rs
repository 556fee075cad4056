//! Authenticated session
//!
//! A session pairs the auth token (`sid`) with the account id it belongs to.
//! Both are always replaced together.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Hours after issuance at which a session must be refreshed
pub const SESSION_TTL_HOURS: i64 = 12;

/// Cached authentication state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Auth token sent as `NDCAUTH: sid=<token>`
    pub token: String,
    /// Account id of the logged-in user
    pub user_id: String,
    /// When the token was obtained
    pub issued_at: DateTime<Utc>,
}

impl Session {
    /// Create a session issued now
    pub fn new(token: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self::issued_at(token, user_id, Utc::now())
    }

    /// Create a session with an explicit issuance time (restored from disk)
    pub fn issued_at(
        token: impl Into<String>,
        user_id: impl Into<String>,
        issued_at: DateTime<Utc>,
    ) -> Self {
        Self {
            token: token.into(),
            user_id: user_id.into(),
            issued_at,
        }
    }

    /// Age of the session at `now`
    pub fn age_at(&self, now: DateTime<Utc>) -> Duration {
        now - self.issued_at
    }

    /// Whether the session is still inside `ttl` at `now`
    pub fn is_fresh_at(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        self.age_at(now) <= ttl
    }

    /// Whether the session is still inside the default freshness window
    pub fn is_fresh(&self) -> bool {
        self.is_fresh_at(Utc::now(), Duration::hours(SESSION_TTL_HOURS))
    }
}
