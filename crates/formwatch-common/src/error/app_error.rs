//! Application error types
//!
//! Errors that surface at the relay's HTTP edge. Inbound WebSocket frames
//! never produce these; they are dropped and logged by the handlers.

use formwatch_core::DomainError;
use serde::Serialize;

/// Application-wide error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Handshake authentication
    #[error("Missing authentication")]
    MissingAuth,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token expired")]
    TokenExpired,

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Internal server error")]
    Internal(#[source] anyhow::Error),

    #[error("Server error: {0}")]
    Server(String),
}

impl AppError {
    /// HTTP status the handshake is rejected with
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::MissingAuth | Self::InvalidToken | Self::TokenExpired => 401,
            Self::Domain(e) if e.is_authorization() => 403,
            Self::Domain(e) if e.is_validation() => 400,
            Self::Domain(_) | Self::Internal(_) | Self::Server(_) => 500,
        }
    }

    /// Machine readable code for the response body
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::MissingAuth => "MISSING_AUTH",
            Self::InvalidToken => "INVALID_TOKEN",
            Self::TokenExpired => "TOKEN_EXPIRED",
            Self::Domain(e) => e.code(),
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::Server(_) => "SERVER_ERROR",
        }
    }

    /// Whether the client caused the failure (4xx)
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code())
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl From<&AppError> for ErrorResponse {
    fn from(err: &AppError) -> Self {
        // Internal causes stay in the logs
        Self {
            code: err.error_code().to_string(),
            message: err.to_string(),
        }
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
