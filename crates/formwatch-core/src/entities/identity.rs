//! Authenticated identity attached to a connection

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::DomainError;
use crate::value_objects::UserId;

/// Role of the account behind a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// End user filling in the form
    User,
    /// Administrator watching users
    Admin,
}

impl Role {
    /// Get the string representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
        }
    }

    #[must_use]
    pub const fn is_admin(self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            _ => Err(DomainError::InvalidRole(s.to_string())),
        }
    }
}

/// Identity established once at connection time
///
/// Produced by the identity provider from a validated token and never
/// changed for the lifetime of the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: UserId,
    pub role: Role,
}

impl Identity {
    #[must_use]
    pub const fn new(user_id: UserId, role: Role) -> Self {
        Self { user_id, role }
    }

    /// Identity of an end user
    #[must_use]
    pub const fn user(user_id: UserId) -> Self {
        Self::new(user_id, Role::User)
    }

    /// Identity of an administrator
    #[must_use]
    pub const fn admin(user_id: UserId) -> Self {
        Self::new(user_id, Role::Admin)
    }

    #[must_use]
    pub const fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    /// Ensure an event claiming to be from `claimed` really comes from this identity
    pub fn ensure_owns(&self, claimed: UserId) -> Result<(), DomainError> {
        if self.user_id == claimed {
            Ok(())
        } else {
            Err(DomainError::IdentityMismatch {
                claimed,
                actual: self.user_id,
            })
        }
    }

    /// Ensure this identity has the given role for `event`
    pub fn ensure_role(&self, role: Role, event: &str) -> Result<(), DomainError> {
        if self.role == role {
            Ok(())
        } else {
            Err(DomainError::RoleNotPermitted {
                role: self.role,
                event: event.to_string(),
            })
        }
    }
}
