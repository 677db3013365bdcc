//! Relay message format
//!
//! Every frame in either direction is a JSON envelope `{"event": ..., "data": ...}`.

use super::{
    AllUserStatusEvent, EventName, FormSavedEvent, LoginEvent, StatusEvent, TypingEndEvent,
    TypingEvent, UserFormStateEvent,
};
use formwatch_core::{PresenceState, RelayEvent, UserId};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Relay message envelope
///
/// `event` stays a plain string on the way in so unknown names can be logged
/// and dropped instead of failing the whole frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Event name
    pub event: String,

    /// Event data payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl Envelope {
    // === Server Messages ===

    /// Build an outbound message from a typed payload
    #[must_use]
    pub fn new<T: Serialize>(event: EventName, data: &T) -> Self {
        Self {
            event: event.as_str().to_string(),
            data: Some(serde_json::to_value(data).unwrap_or_default()),
        }
    }

    /// Build a message without data
    #[must_use]
    pub fn bare(event: EventName) -> Self {
        Self {
            event: event.as_str().to_string(),
            data: None,
        }
    }

    /// `user:status` for a presence transition
    #[must_use]
    pub fn status(user_id: UserId, state: &PresenceState) -> Self {
        Self::new(EventName::UserStatus, &StatusEvent::new(user_id, state))
    }

    /// `admin:userFormState` reply
    #[must_use]
    pub fn user_form_state(state: &UserFormStateEvent) -> Self {
        Self::new(EventName::UserFormState, state)
    }

    /// `admin:allUserStatus` reply
    #[must_use]
    pub fn all_user_status(users: &AllUserStatusEvent) -> Self {
        Self::new(EventName::AllUserStatus, users)
    }

    // === Parsing ===

    /// Known event name, if any
    pub fn name(&self) -> Option<EventName> {
        EventName::parse(&self.event)
    }

    /// Decode the data payload into a typed structure
    ///
    /// A missing `data` field decodes as JSON `null`.
    pub fn data_as<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        match &self.data {
            Some(data) => T::deserialize(data),
            None => T::deserialize(Value::Null),
        }
    }

    // === Utilities ===

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl From<&RelayEvent> for Envelope {
    fn from(event: &RelayEvent) -> Self {
        match event {
            RelayEvent::TypingStarted {
                user_id,
                field,
                value,
            } => Self::new(
                EventName::TypingStart,
                &TypingEvent {
                    user_id: *user_id,
                    field: field.clone(),
                    value: value.clone(),
                },
            ),
            RelayEvent::TypingUpdated {
                user_id,
                field,
                value,
            } => Self::new(
                EventName::TypingUpdate,
                &TypingEvent {
                    user_id: *user_id,
                    field: field.clone(),
                    value: value.clone(),
                },
            ),
            RelayEvent::TypingEnded { user_id, field } => Self::new(
                EventName::TypingEnd,
                &TypingEndEvent {
                    user_id: *user_id,
                    field: field.clone(),
                },
            ),
            RelayEvent::StatusChanged { user_id, state } => Self::status(*user_id, state),
            RelayEvent::UserLoggedIn { user_id } => {
                Self::new(EventName::UserLogin, &LoginEvent { user_id: *user_id })
            }
            RelayEvent::FormSaved { user_id, form_id } => Self::new(
                EventName::FormSaved,
                &FormSavedEvent {
                    user_id: *user_id,
                    form_id: form_id.clone(),
                },
            ),
        }
    }
}

impl std::fmt::Display for Envelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Envelope(event={})", self.event)
    }
}
