//! Error types for Chorus
//!
//! Every failure a handler can produce is one of these variants. Each maps
//! to an HTTP status and a stable machine-readable code that clients can
//! switch on instead of parsing the message.

use hyper::StatusCode;
use serde::Serialize;

/// Main error type for Chorus operations
#[derive(Debug, thiserror::Error)]
pub enum ChorusError {
    #[error("{0}")]
    Validation(String),

    #[error("{field} is already taken")]
    Conflict { field: &'static str },

    /// Unknown handle and wrong secret share this variant on purpose
    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("{0}")]
    SelfAction(String),

    #[error("Unauthorized: No Token Provided")]
    Unauthenticated,

    #[error("Unauthorized: {0}")]
    InvalidToken(String),

    #[error("Unauthorized: User no longer exists")]
    UnknownIdentity,

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Asset host error: {0}")]
    Asset(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// JSON body returned for every failed request
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
}

impl ChorusError {
    /// Convert error to HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_)
            | Self::Conflict { .. }
            | Self::InvalidCredentials
            | Self::SelfAction(_) => StatusCode::BAD_REQUEST,
            Self::Unauthenticated | Self::InvalidToken(_) | Self::UnknownIdentity => {
                StatusCode::UNAUTHORIZED
            }
            Self::Unauthorized(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Config(_) | Self::Database(_) | Self::Asset(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Stable code for the taxonomy entry
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Conflict { .. } => "CONFLICT",
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::SelfAction(_) => "SELF_ACTION",
            Self::Unauthenticated => "UNAUTHENTICATED",
            Self::InvalidToken(_) => "INVALID_TOKEN",
            Self::UnknownIdentity => "UNKNOWN_IDENTITY",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Config(_) | Self::Database(_) | Self::Asset(_) | Self::Internal(_) => "INTERNAL",
        }
    }

    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }

    /// Convert to status code and response body.
    ///
    /// Server-side failures are reported generically; the detail belongs in
    /// the log, not in the response.
    pub fn into_status_code_and_body(self) -> (StatusCode, ErrorResponse) {
        let status = self.status_code();
        let code = self.code();
        let error = if status.is_server_error() {
            "Internal Server Error".to_string()
        } else {
            self.to_string()
        };
        (status, ErrorResponse { error, code })
    }
}

impl From<std::io::Error> for ChorusError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for ChorusError {
    fn from(err: serde_json::Error) -> Self {
        Self::Validation(format!("Invalid JSON: {}", err))
    }
}

impl From<mongodb::error::Error> for ChorusError {
    fn from(err: mongodb::error::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<bson::ser::Error> for ChorusError {
    fn from(err: bson::ser::Error) -> Self {
        Self::Database(format!("BSON encode failed: {}", err))
    }
}

impl From<bson::de::Error> for ChorusError {
    fn from(err: bson::de::Error) -> Self {
        Self::Database(format!("BSON decode failed: {}", err))
    }
}

impl From<reqwest::Error> for ChorusError {
    fn from(err: reqwest::Error) -> Self {
        Self::Asset(err.to_string())
    }
}

impl From<jsonwebtoken::errors::Error> for ChorusError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        Self::InvalidToken(err.to_string())
    }
}

/// Result type alias for Chorus operations
pub type Result<T> = std::result::Result<T, ChorusError>;
