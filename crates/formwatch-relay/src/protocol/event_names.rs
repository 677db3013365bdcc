//! Relay event names
//!
//! Every frame carries one of these names in its `event` field.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Event names understood or emitted by the relay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventName {
    /// A field started being edited (client/server)
    TypingStart,
    /// New value of a field being edited (client/server)
    TypingUpdate,
    /// A field stopped being edited (client/server)
    TypingEnd,
    /// Presence label of a user (client/server)
    UserStatus,
    /// First connection of a user (server only)
    UserLogin,
    /// A form was persisted by the record store (client/server)
    FormSaved,
    /// Admin asks for one user's live state (client only)
    RequestUserFormState,
    /// Admin asks for every user's presence (client only)
    RequestAllUserStatus,
    /// Reply to `RequestUserFormState` (server only)
    UserFormState,
    /// Reply to `RequestAllUserStatus` (server only)
    AllUserStatus,
}

impl EventName {
    /// All known names
    pub const ALL: [Self; 10] = [
        Self::TypingStart,
        Self::TypingUpdate,
        Self::TypingEnd,
        Self::UserStatus,
        Self::UserLogin,
        Self::FormSaved,
        Self::RequestUserFormState,
        Self::RequestAllUserStatus,
        Self::UserFormState,
        Self::AllUserStatus,
    ];

    /// Wire name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TypingStart => "typing:start",
            Self::TypingUpdate => "typing:update",
            Self::TypingEnd => "typing:end",
            Self::UserStatus => "user:status",
            Self::UserLogin => "user:login",
            Self::FormSaved => "form:saved",
            Self::RequestUserFormState => "admin:requestUserFormState",
            Self::RequestAllUserStatus => "admin:requestAllUserStatus",
            Self::UserFormState => "admin:userFormState",
            Self::AllUserStatus => "admin:allUserStatus",
        }
    }

    /// Parse a wire name
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|e| e.as_str() == name)
    }

    /// Check if clients may send this event
    #[must_use]
    pub const fn is_client_event(self) -> bool {
        matches!(
            self,
            Self::TypingStart
                | Self::TypingUpdate
                | Self::TypingEnd
                | Self::UserStatus
                | Self::FormSaved
                | Self::RequestUserFormState
                | Self::RequestAllUserStatus
        )
    }

    /// Check if the relay may send this event
    #[must_use]
    pub const fn is_server_event(self) -> bool {
        !matches!(self, Self::RequestUserFormState | Self::RequestAllUserStatus)
    }

    /// Check if only admin connections may send this event
    #[must_use]
    pub const fn is_admin_request(self) -> bool {
        matches!(self, Self::RequestUserFormState | Self::RequestAllUserStatus)
    }
}

impl Serialize for EventName {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EventName {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Self::parse(&value)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown event: {value}")))
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
