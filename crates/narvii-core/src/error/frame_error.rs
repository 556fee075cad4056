//! Frame decoding errors

use thiserror::Error;

/// Why an inbound frame could not be decoded
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("Malformed frame: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Frame is missing field `{0}`")]
    MissingField(&'static str),

    #[error("Frame kind {0} is not a chat message")]
    UnexpectedKind(i64),
}
