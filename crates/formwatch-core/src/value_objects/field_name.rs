//! Form field name
//!
//! Field names are the keys of the profile form (`first_name`, `bio`, ...).
//! They arrive from clients, so they are bounded and restricted to a safe
//! character set before they are used as map keys or echoed to admins.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

use crate::error::DomainError;

/// Maximum length of a field name in bytes
pub const MAX_FIELD_NAME_LEN: usize = 64;

/// Maximum length of a relayed field value in bytes
pub const MAX_FIELD_VALUE_LEN: usize = 4096;

/// Validated form field name
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FieldName(String);

impl FieldName {
    /// Parse and validate a field name
    pub fn parse(name: impl Into<String>) -> Result<Self, DomainError> {
        let name = name.into();

        if name.is_empty() || name.len() > MAX_FIELD_NAME_LEN {
            return Err(DomainError::InvalidField(name));
        }

        let allowed = name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
        if !allowed {
            return Err(DomainError::InvalidField(name));
        }

        Ok(Self(name))
    }

    /// Get the field name as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FieldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for FieldName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for FieldName {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<FieldName> for String {
    fn from(name: FieldName) -> Self {
        name.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_names() {
        assert!(FieldName::parse("first_name").is_ok());
        assert!(FieldName::parse("address.line-2").is_ok());
        assert_eq!(FieldName::parse("bio").unwrap().as_str(), "bio");
    }

    #[test]
    fn test_invalid_names() {
        assert!(FieldName::parse("").is_err());
        assert!(FieldName::parse("first name").is_err());
        assert!(FieldName::parse("<script>").is_err());
        assert!(FieldName::parse("x".repeat(MAX_FIELD_NAME_LEN + 1)).is_err());
    }

    #[test]
    fn test_deserialize_validates() {
        let ok: Result<FieldName, _> = serde_json::from_str("\"city\"");
        assert!(ok.is_ok());

        let bad: Result<FieldName, _> = serde_json::from_str("\"not ok\"");
        assert!(bad.is_err());
    }
}
