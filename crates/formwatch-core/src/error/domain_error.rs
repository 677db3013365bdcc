//! Domain errors - error types for the domain layer

use thiserror::Error;

use crate::entities::Role;
use crate::value_objects::UserId;

/// Domain layer errors
#[derive(Debug, Error)]
pub enum DomainError {
    // =========================================================================
    // Validation Errors
    // =========================================================================
    #[error("Invalid user id: {0}")]
    InvalidUserId(String),

    #[error("Invalid field name: {0:?}")]
    InvalidField(String),

    #[error("Field value too long: max {max} bytes")]
    ValueTooLong { max: usize },

    #[error("Invalid role: {0}")]
    InvalidRole(String),

    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    #[error("Invalid form id: {0:?}")]
    InvalidFormId(String),

    // =========================================================================
    // Authorization Errors
    // =========================================================================
    #[error("Connection of {actual} cannot act for {claimed}")]
    IdentityMismatch { claimed: UserId, actual: UserId },

    #[error("Role {role} cannot send {event}")]
    RoleNotPermitted { role: Role, event: String },
}

impl DomainError {
    /// Get an error code string for logs and responses
    pub fn code(&self) -> &'static str {
        match self {
            // Validation
            Self::InvalidUserId(_) => "INVALID_USER_ID",
            Self::InvalidField(_) => "INVALID_FIELD",
            Self::ValueTooLong { .. } => "VALUE_TOO_LONG",
            Self::InvalidRole(_) => "INVALID_ROLE",
            Self::InvalidStatus(_) => "INVALID_STATUS",
            Self::InvalidFormId(_) => "INVALID_FORM_ID",

            // Authorization
            Self::IdentityMismatch { .. } => "IDENTITY_MISMATCH",
            Self::RoleNotPermitted { .. } => "ROLE_NOT_PERMITTED",
        }
    }

    /// Check if this is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidUserId(_)
                | Self::InvalidField(_)
                | Self::ValueTooLong { .. }
                | Self::InvalidRole(_)
                | Self::InvalidStatus(_)
                | Self::InvalidFormId(_)
        )
    }

    /// Check if this is an authorization error
    pub fn is_authorization(&self) -> bool {
        matches!(self, Self::IdentityMismatch { .. } | Self::RoleNotPermitted { .. })
    }
}
