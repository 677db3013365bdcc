//! Typing session entity

use chrono::{DateTime, Utc};
use std::time::Instant;

use crate::value_objects::{FieldName, UserId};

/// In-progress edit of one field by one user
#[derive(Debug, Clone)]
pub struct TypingSession {
    pub(super) user_id: UserId,
    pub(super) field: FieldName,
    pub(super) value: String,
    pub(super) started_at: DateTime<Utc>,
    pub(super) updated_at: DateTime<Utc>,
    /// Bumped on every touch; an idle timer is only honoured for the latest one
    pub(super) generation: u64,
    /// Fixed for the session's lifetime; identifies flush timers
    pub(super) serial: u64,
    pub(super) last_forwarded: Instant,
    /// A value newer than the last forwarded one is waiting for a flush
    pub(super) buffered: bool,
}

impl TypingSession {
    pub(super) fn new(
        user_id: UserId,
        field: FieldName,
        value: String,
        now: Instant,
        at: DateTime<Utc>,
        generation: u64,
    ) -> Self {
        Self {
            user_id,
            field,
            value,
            started_at: at,
            updated_at: at,
            generation,
            serial: generation,
            last_forwarded: now,
            buffered: false,
        }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn field(&self) -> &FieldName {
        &self.field
    }

    /// Latest value snapshot
    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}
