//! Presence state of a user as observed by admins

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::DomainError;
use crate::value_objects::FieldName;

/// Coarse presence label without the typing field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PresenceStatus {
    #[default]
    Offline,
    Online,
    Typing,
}

impl PresenceStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Offline => "offline",
            Self::Online => "online",
            Self::Typing => "typing",
        }
    }
}

impl fmt::Display for PresenceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PresenceStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "offline" => Ok(Self::Offline),
            "online" => Ok(Self::Online),
            "typing" => Ok(Self::Typing),
            _ => Err(DomainError::InvalidStatus(s.to_string())),
        }
    }
}

/// Presence of a single user
///
/// `Typing` carries the most recently active field. It holds iff the user has
/// at least one live typing session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum PresenceState {
    #[default]
    Offline,
    Online,
    Typing {
        #[serde(rename = "typingField")]
        field: FieldName,
    },
}

impl PresenceState {
    /// Get the coarse status label
    #[must_use]
    pub fn status(&self) -> PresenceStatus {
        match self {
            Self::Offline => PresenceStatus::Offline,
            Self::Online => PresenceStatus::Online,
            Self::Typing { .. } => PresenceStatus::Typing,
        }
    }

    /// Field currently labelled as being typed in
    #[must_use]
    pub fn typing_field(&self) -> Option<&FieldName> {
        match self {
            Self::Typing { field } => Some(field),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_typing(&self) -> bool {
        matches!(self, Self::Typing { .. })
    }
}

impl fmt::Display for PresenceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Typing { field } => write!(f, "typing({field})"),
            other => f.write_str(other.status().as_str()),
        }
    }
}
