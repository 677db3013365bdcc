//! Event payload definitions
//!
//! Inbound payloads are validated with `validator` before they reach the hub;
//! outbound payloads are built by the relay from domain state.

use chrono::{DateTime, Utc};
use formwatch_core::{
    DomainError, FieldName, PresenceState, PresenceStatus, UserId, MAX_FIELD_NAME_LEN,
    MAX_FIELD_VALUE_LEN,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use validator::Validate;

/// Maximum length of an opaque form reference
pub const MAX_FORM_ID_LEN: usize = 128;

const FIELD_NAME_MAX: u64 = MAX_FIELD_NAME_LEN as u64;

// === Inbound ===

/// `typing:start` / `typing:update` data
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TypingPayload {
    pub user_id: UserId,
    #[validate(length(min = 1, max = FIELD_NAME_MAX))]
    pub field: String,
    #[serde(default)]
    #[validate(custom(function = "validate_value_bytes"))]
    pub value: String,
}

/// The tracker bounds values in bytes, so count bytes here too
fn validate_value_bytes(value: &str) -> Result<(), validator::ValidationError> {
    if value.len() > MAX_FIELD_VALUE_LEN {
        return Err(validator::ValidationError::new("value")
            .with_message(format!("value exceeds {MAX_FIELD_VALUE_LEN} bytes").into()));
    }
    Ok(())
}

/// `typing:end` data
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TypingEndPayload {
    pub user_id: UserId,
    #[validate(length(min = 1, max = FIELD_NAME_MAX))]
    pub field: String,
}

/// `user:status` data
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdatePayload {
    pub user_id: UserId,
    #[validate(custom(function = "validate_explicit_status"))]
    pub status: String,
}

impl StatusUpdatePayload {
    /// Parsed status; only `online` and `offline` pass validation
    pub fn parsed_status(&self) -> Option<PresenceStatus> {
        self.status
            .parse()
            .ok()
            .filter(|s| *s != PresenceStatus::Typing)
    }
}

fn validate_explicit_status(status: &str) -> Result<(), validator::ValidationError> {
    match status.parse::<PresenceStatus>() {
        Ok(PresenceStatus::Online | PresenceStatus::Offline) => Ok(()),
        _ => Err(validator::ValidationError::new("status")
            .with_message("status must be online or offline".into())),
    }
}

/// Form reference as sent by clients; the record store uses integer ids but
/// the relay treats it as opaque
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum FormRef {
    Number(i64),
    Text(String),
}

impl FormRef {
    /// Normalize to the string form relayed to observers
    pub fn into_string(self) -> Result<String, DomainError> {
        match self {
            Self::Number(n) => Ok(n.to_string()),
            Self::Text(s) if s.is_empty() || s.len() > MAX_FORM_ID_LEN => {
                Err(DomainError::InvalidFormId(s))
            }
            Self::Text(s) => Ok(s),
        }
    }
}

/// `form:saved` data
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormSavedPayload {
    pub user_id: UserId,
    #[serde(default)]
    pub form_id: Option<FormRef>,
}

/// `admin:requestUserFormState` data
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRefPayload {
    pub user_id: UserId,
}

// === Outbound ===

/// `typing:start` / `typing:update` relayed to observers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingEvent {
    pub user_id: UserId,
    pub field: FieldName,
    pub value: String,
}

/// `typing:end` relayed to observers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingEndEvent {
    pub user_id: UserId,
    pub field: FieldName,
}

/// `user:status` and the entries of `admin:allUserStatus`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusEvent {
    pub user_id: UserId,
    pub status: PresenceStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub typing_field: Option<FieldName>,
}

impl StatusEvent {
    #[must_use]
    pub fn new(user_id: UserId, state: &PresenceState) -> Self {
        Self {
            user_id,
            status: state.status(),
            typing_field: state.typing_field().cloned(),
        }
    }
}

/// `user:login`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginEvent {
    pub user_id: UserId,
}

/// `form:saved` relayed to observers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormSavedEvent {
    pub user_id: UserId,
    pub form_id: Option<String>,
}

/// One live typing session in a user snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldActivity {
    pub field: FieldName,
    pub value: String,
    pub started_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
}

/// `admin:userFormState`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserFormStateEvent {
    pub user_id: UserId,
    pub presence: PresenceState,
    /// Live typing sessions, ordered by field
    pub fields: Vec<FieldActivity>,
    /// Last known unsaved value of every field the user touched
    pub drafts: BTreeMap<FieldName, String>,
}

/// `admin:allUserStatus`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllUserStatusEvent {
    pub users: Vec<StatusEvent>,
}
