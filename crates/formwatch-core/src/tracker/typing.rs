//! Typing session tracker
//!
//! Holds at most one [`TypingSession`] per (user, field). Starts and updates
//! are the same upsert: the first touch of a field opens a session, later
//! touches refresh its value and activity. Forwarding of value changes is
//! coalesced so a field emits at most one update per coalescing interval.

use chrono::{DateTime, Utc};
use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};

use super::TypingSession;
use crate::error::DomainError;
use crate::value_objects::{FieldName, UserId, MAX_FIELD_VALUE_LEN};

/// What the caller must do after a touch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchKind {
    /// A new session was opened; forward a start event
    Started,
    /// Forward the new value now
    Forward,
    /// Value buffered; arm a flush timer firing after `flush_in`
    Buffered { flush_in: Duration },
    /// Value buffered behind an already armed flush timer
    Coalesced,
    /// Same value as before; only the idle timer is refreshed
    Unchanged,
}

/// Result of starting or updating a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Touch {
    pub kind: TouchKind,
    /// Generation to arm the idle timer with
    pub generation: u64,
    /// Session serial to arm a flush timer with
    pub serial: u64,
}

/// A session that has just been removed
#[derive(Debug, Clone)]
pub struct EndedSession {
    pub session: TypingSession,
    /// Buffered value that was never forwarded, if any
    pub flushed: Option<String>,
}

impl EndedSession {
    fn from_session(session: TypingSession) -> Self {
        let flushed = session.buffered.then(|| session.value.clone());
        Self { session, flushed }
    }
}

/// Tracks live typing sessions and the last draft value of every field
#[derive(Debug)]
pub struct TypingTracker {
    sessions: HashMap<UserId, HashMap<FieldName, TypingSession>>,
    drafts: HashMap<UserId, BTreeMap<FieldName, String>>,
    coalesce: Duration,
    counter: u64,
}

impl TypingTracker {
    /// Create a tracker forwarding at most one update per `coalesce` per field
    ///
    /// A zero interval forwards every change immediately.
    #[must_use]
    pub fn new(coalesce: Duration) -> Self {
        Self {
            sessions: HashMap::new(),
            drafts: HashMap::new(),
            coalesce,
            counter: 0,
        }
    }

    /// Upsert the session for (user, field) with a new value
    ///
    /// Used for both `typing:start` and `typing:update`.
    pub fn touch(
        &mut self,
        user_id: UserId,
        field: FieldName,
        value: String,
        now: Instant,
        at: DateTime<Utc>,
    ) -> Result<Touch, DomainError> {
        if value.len() > MAX_FIELD_VALUE_LEN {
            return Err(DomainError::ValueTooLong {
                max: MAX_FIELD_VALUE_LEN,
            });
        }

        self.counter += 1;
        let generation = self.counter;
        let coalesce = self.coalesce;

        self.drafts
            .entry(user_id)
            .or_default()
            .insert(field.clone(), value.clone());

        let fields = self.sessions.entry(user_id).or_default();

        let touch = match fields.entry(field) {
            Entry::Vacant(slot) => {
                let field = slot.key().clone();
                slot.insert(TypingSession::new(user_id, field, value, now, at, generation));
                Touch {
                    kind: TouchKind::Started,
                    generation,
                    serial: generation,
                }
            }
            Entry::Occupied(slot) => {
                let session = slot.into_mut();
                session.generation = generation;
                session.updated_at = at;

                let kind = if session.value == value {
                    TouchKind::Unchanged
                } else {
                    session.value = value;
                    let elapsed = now.saturating_duration_since(session.last_forwarded);

                    if session.buffered {
                        TouchKind::Coalesced
                    } else if coalesce.is_zero() || elapsed >= coalesce {
                        session.last_forwarded = now;
                        TouchKind::Forward
                    } else {
                        session.buffered = true;
                        TouchKind::Buffered {
                            flush_in: coalesce - elapsed,
                        }
                    }
                };

                Touch {
                    kind,
                    generation,
                    serial: session.serial,
                }
            }
        };

        Ok(touch)
    }

    /// Take the buffered value of a session for forwarding
    ///
    /// Returns `None` when the session is gone, was replaced, or has nothing buffered.
    pub fn flush(
        &mut self,
        user_id: UserId,
        field: &FieldName,
        serial: u64,
        now: Instant,
    ) -> Option<String> {
        let session = self.sessions.get_mut(&user_id)?.get_mut(field)?;
        if session.serial != serial || !session.buffered {
            return None;
        }

        session.buffered = false;
        session.last_forwarded = now;
        Some(session.value.clone())
    }

    /// End a session explicitly
    ///
    /// Ending a session that no longer exists is a no-op.
    pub fn end(&mut self, user_id: UserId, field: &FieldName) -> Option<EndedSession> {
        let fields = self.sessions.get_mut(&user_id)?;
        let session = fields.remove(field)?;

        if fields.is_empty() {
            self.sessions.remove(&user_id);
        }

        Some(EndedSession::from_session(session))
    }

    /// End a session because its idle timer fired
    ///
    /// Ignored unless `generation` is still the session's latest one.
    pub fn expire(
        &mut self,
        user_id: UserId,
        field: &FieldName,
        generation: u64,
    ) -> Option<EndedSession> {
        let current = self.session(user_id, field)?.generation;
        if current != generation {
            return None;
        }
        self.end(user_id, field)
    }

    /// End every session of a user, ordered by field name
    pub fn end_all(&mut self, user_id: UserId) -> Vec<EndedSession> {
        let Some(fields) = self.sessions.remove(&user_id) else {
            return Vec::new();
        };

        let mut ended: Vec<EndedSession> = fields
            .into_values()
            .map(EndedSession::from_session)
            .collect();
        ended.sort_by(|a, b| a.session.field.cmp(&b.session.field));
        ended
    }

    /// Get a single session
    pub fn session(&self, user_id: UserId, field: &FieldName) -> Option<&TypingSession> {
        self.sessions.get(&user_id)?.get(field)
    }

    /// All live sessions of a user, ordered by field name
    pub fn sessions(&self, user_id: UserId) -> Vec<&TypingSession> {
        let mut sessions: Vec<&TypingSession> = self
            .sessions
            .get(&user_id)
            .map(|fields| fields.values().collect())
            .unwrap_or_default();
        sessions.sort_by(|a, b| a.field.cmp(&b.field));
        sessions
    }

    pub fn has_sessions(&self, user_id: UserId) -> bool {
        self.sessions.contains_key(&user_id)
    }

    /// Field touched most recently among the user's live sessions
    pub fn most_recent_field(&self, user_id: UserId) -> Option<&FieldName> {
        self.sessions
            .get(&user_id)?
            .values()
            .max_by_key(|s| s.generation)
            .map(|s| &s.field)
    }

    /// Total number of live sessions
    pub fn session_count(&self) -> usize {
        self.sessions.values().map(HashMap::len).sum()
    }

    /// Last known unsaved values of a user
    pub fn drafts(&self, user_id: UserId) -> Option<&BTreeMap<FieldName, String>> {
        self.drafts.get(&user_id)
    }

    /// Forget the draft values of a user (form saved or user gone)
    pub fn clear_drafts(&mut self, user_id: UserId) -> bool {
        self.drafts.remove(&user_id).is_some()
    }
}

impl Default for TypingTracker {
    fn default() -> Self {
        Self::new(Duration::ZERO)
    }
}
