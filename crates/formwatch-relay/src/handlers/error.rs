//! Handler error types

use crate::protocol::EventName;
use formwatch_core::DomainError;
use thiserror::Error;

/// Why an inbound frame was dropped
///
/// None of these close the connection; the frame is logged and ignored.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Frame is not a JSON envelope
    #[error("Malformed frame: {0}")]
    Decode(#[source] serde_json::Error),

    /// Event name not part of the protocol
    #[error("Unknown event: {0}")]
    UnknownEvent(String),

    /// Event exists but only the relay sends it
    #[error("Event {0} cannot be sent by clients")]
    ServerOnlyEvent(EventName),

    /// Data does not match the event's payload shape
    #[error("Invalid payload for {event}: {source}")]
    InvalidPayload {
        event: EventName,
        #[source]
        source: serde_json::Error,
    },

    /// Payload failed field validation
    #[error("Validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    /// Field, ownership, or role check failed
    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl HandlerError {
    /// Check if the frame was dropped for acting outside the connection's identity
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Domain(e) if e.is_authorization())
    }

    /// Short code for logs
    pub fn code(&self) -> &'static str {
        match self {
            Self::Decode(_) => "DECODE_ERROR",
            Self::UnknownEvent(_) => "UNKNOWN_EVENT",
            Self::ServerOnlyEvent(_) => "SERVER_ONLY_EVENT",
            Self::InvalidPayload { .. } => "INVALID_PAYLOAD",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Domain(e) => e.code(),
        }
    }
}

/// Handler result type
pub type HandlerResult<T> = Result<T, HandlerError>;
