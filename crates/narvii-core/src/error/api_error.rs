//! Request gateway errors - failures reported by the REST API or its transport

use thiserror::Error;

/// Errors raised by a [`RequestGateway`](crate::traits::RequestGateway)
#[derive(Debug, Error)]
pub enum ApiError {
    // =========================================================================
    // API Errors
    // =========================================================================
    /// The API answered with a non-success status
    #[error("Invalid request ({status_code}): {message}")]
    InvalidRequest { message: String, status_code: i64 },

    /// The API answered with something other than JSON (usually an HTML error page)
    #[error("Unexpected non-JSON response: {0}")]
    Html(String),

    // =========================================================================
    // Infrastructure Errors (wrapped)
    // =========================================================================
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Decode error: {0}")]
    Decode(String),
}

impl ApiError {
    /// Platform status code, when the API produced one
    pub fn status_code(&self) -> Option<i64> {
        match self {
            Self::InvalidRequest { status_code, .. } => Some(*status_code),
            _ => None,
        }
    }

    /// Error code string for logs
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidRequest { .. } => "INVALID_REQUEST",
            Self::Html(_) => "HTML_RESPONSE",
            Self::Http(_) => "HTTP_ERROR",
            Self::Decode(_) => "DECODE_ERROR",
        }
    }

    /// Whether the failure happened before the API produced an answer
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Http(_))
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

/// Result type for request gateway operations
pub type ApiResult<T> = Result<T, ApiError>;
