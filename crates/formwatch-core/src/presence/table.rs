//! Presence table
//!
//! Last known presence of every user seen by this process. Users never leave
//! the table; a disconnected user stays as `offline`.

use std::collections::{BTreeMap, HashMap};

use crate::entities::PresenceState;
use crate::tracker::TypingTracker;
use crate::value_objects::UserId;

#[derive(Debug, Default)]
pub struct PresenceTable {
    states: HashMap<UserId, PresenceState>,
}

impl PresenceTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current presence of a user (`offline` if never seen)
    pub fn get(&self, user_id: UserId) -> PresenceState {
        self.states.get(&user_id).cloned().unwrap_or_default()
    }

    /// Set the presence of a user
    ///
    /// Returns the new state if it differs from the previous one.
    pub fn set(&mut self, user_id: UserId, state: PresenceState) -> Option<PresenceState> {
        let previous = self.states.insert(user_id, state.clone());
        if previous.as_ref() == Some(&state) {
            None
        } else {
            Some(state)
        }
    }

    /// Derive the presence label from the user's live typing sessions
    ///
    /// Keeps `typing` iff at least one session exists, labelled with the most
    /// recently touched field. A user without sessions drops from `typing` to
    /// `online`; `online` and `offline` are otherwise left alone.
    pub fn reconcile(&mut self, user_id: UserId, tracker: &TypingTracker) -> Option<PresenceState> {
        let next = match tracker.most_recent_field(user_id) {
            Some(field) => PresenceState::Typing {
                field: field.clone(),
            },
            None => match self.get(user_id) {
                PresenceState::Typing { .. } => PresenceState::Online,
                other => other,
            },
        };
        self.set(user_id, next)
    }

    /// Presence of every known user, ordered by user id
    pub fn snapshot(&self) -> BTreeMap<UserId, PresenceState> {
        self.states
            .iter()
            .map(|(id, state)| (*id, state.clone()))
            .collect()
    }
}
