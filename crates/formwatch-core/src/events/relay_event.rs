//! Events emitted by the relay
//!
//! These are transport-agnostic; the relay crate maps each one onto its wire
//! event name and payload.

use crate::entities::PresenceState;
use crate::value_objects::{FieldName, UserId};

/// All events the relay pushes to clients
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayEvent {
    TypingStarted {
        user_id: UserId,
        field: FieldName,
        value: String,
    },
    TypingUpdated {
        user_id: UserId,
        field: FieldName,
        value: String,
    },
    TypingEnded {
        user_id: UserId,
        field: FieldName,
    },
    StatusChanged {
        user_id: UserId,
        state: PresenceState,
    },
    UserLoggedIn {
        user_id: UserId,
    },
    FormSaved {
        user_id: UserId,
        form_id: Option<String>,
    },
}

impl RelayEvent {
    /// User the event is about
    pub fn user_id(&self) -> UserId {
        match self {
            Self::TypingStarted { user_id, .. }
            | Self::TypingUpdated { user_id, .. }
            | Self::TypingEnded { user_id, .. }
            | Self::StatusChanged { user_id, .. }
            | Self::UserLoggedIn { user_id }
            | Self::FormSaved { user_id, .. } => *user_id,
        }
    }

    /// Short name for logs
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::TypingStarted { .. } => "TYPING_STARTED",
            Self::TypingUpdated { .. } => "TYPING_UPDATED",
            Self::TypingEnded { .. } => "TYPING_ENDED",
            Self::StatusChanged { .. } => "STATUS_CHANGED",
            Self::UserLoggedIn { .. } => "USER_LOGGED_IN",
            Self::FormSaved { .. } => "FORM_SAVED",
        }
    }

    /// Whether the user's own other sessions should see this event too
    pub const fn mirrors_to_user(&self) -> bool {
        matches!(
            self,
            Self::TypingStarted { .. }
                | Self::TypingUpdated { .. }
                | Self::TypingEnded { .. }
                | Self::FormSaved { .. }
        )
    }
}
