//! Handshake rejection
//!
//! Turns an identity failure into an HTTP error response before the upgrade.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use formwatch_common::{AppError, ErrorResponse};

/// Response returned instead of upgrading the connection
#[derive(Debug)]
pub struct HandshakeRejection(pub AppError);

impl From<AppError> for HandshakeRejection {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl IntoResponse for HandshakeRejection {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::error!(error = ?self.0, "Handshake failed");
        } else {
            tracing::debug!(code = self.0.error_code(), "Handshake rejected");
        }

        (status, Json(ErrorResponse::from(&self.0))).into_response()
    }
}
