//! Account entities returned by the REST API

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// User profile
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub uid: Option<String>,
    pub nickname: Option<String>,
    pub icon: Option<String>,
    pub level: Option<i64>,
    pub reputation: Option<i64>,
    pub role: Option<i64>,
    pub ndc_id: Option<i64>,
    pub content: Option<String>,
    /// Fields this crate does not model
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Response to `auth/login`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub sid: Option<String>,
    pub auid: Option<String>,
    pub secret: Option<String>,
    pub user_profile: Option<UserProfile>,
}
