//! Error types for Guildhall

use hyper::StatusCode;

/// Main error type for Guildhall operations
#[derive(Debug, thiserror::Error)]
pub enum GuildError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl GuildError {
    /// Convert error to HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::AlreadyExists(_) => StatusCode::CONFLICT,
            Self::PreconditionFailed(_) => StatusCode::PRECONDITION_FAILED,
            Self::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Convert to status code and body tuple for HTTP response
    pub fn into_status_code_and_body(self) -> (StatusCode, String) {
        let status = self.status_code();
        let body = self.to_string();
        (status, body)
    }
}

// Implement From conversions for common error types

impl From<std::io::Error> for GuildError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for GuildError {
    fn from(err: serde_json::Error) -> Self {
        Self::BadRequest(format!("JSON error: {}", err))
    }
}

impl From<hyper::Error> for GuildError {
    fn from(err: hyper::Error) -> Self {
        Self::Internal(format!("HTTP error: {}", err))
    }
}

impl From<sled::Error> for GuildError {
    fn from(err: sled::Error) -> Self {
        Self::Store(err.to_string())
    }
}

impl From<rmp_serde::encode::Error> for GuildError {
    fn from(err: rmp_serde::encode::Error) -> Self {
        Self::Store(format!("Serialization error: {}", err))
    }
}

impl From<rmp_serde::decode::Error> for GuildError {
    fn from(err: rmp_serde::decode::Error) -> Self {
        Self::Store(format!("Deserialization error: {}", err))
    }
}

/// Result type alias for Guildhall operations
pub type Result<T> = std::result::Result<T, GuildError>;
