//! Presence broadcaster
//!
//! Pushes presence transitions to admins and builds the snapshots admins
//! request to recover from missed events.

use super::{Delivery, EventRelay};
use crate::connection::ConnectionRegistry;
use crate::protocol::{AllUserStatusEvent, Envelope, FieldActivity, StatusEvent, UserFormStateEvent};
use formwatch_core::{PresenceState, PresenceTable, TypingTracker, UserId};
use std::collections::BTreeMap;

pub struct PresenceBroadcaster;

impl PresenceBroadcaster {
    /// Push `user:status` to every admin connection
    pub fn broadcast_status(
        registry: &ConnectionRegistry,
        user_id: UserId,
        state: &PresenceState,
    ) -> Delivery {
        tracing::debug!(user_id = %user_id, presence = %state, "Presence changed");
        EventRelay::route_to_admins(registry, &Envelope::status(user_id, state))
    }

    /// Presence of every user seen by this process
    pub fn snapshot_all_users(presence: &PresenceTable) -> BTreeMap<UserId, PresenceState> {
        presence.snapshot()
    }

    /// Reply body for `admin:requestAllUserStatus`
    pub fn all_user_status(presence: &PresenceTable) -> AllUserStatusEvent {
        let users = Self::snapshot_all_users(presence)
            .iter()
            .map(|(user_id, state)| StatusEvent::new(*user_id, state))
            .collect();
        AllUserStatusEvent { users }
    }

    /// Reply body for `admin:requestUserFormState`
    ///
    /// An unknown user yields `offline` with no fields.
    pub fn snapshot_user(
        presence: &PresenceTable,
        tracker: &TypingTracker,
        user_id: UserId,
    ) -> UserFormStateEvent {
        let fields = tracker
            .sessions(user_id)
            .into_iter()
            .map(|session| FieldActivity {
                field: session.field().clone(),
                value: session.value().to_string(),
                started_at: session.started_at(),
                last_activity_at: session.updated_at(),
            })
            .collect();

        UserFormStateEvent {
            user_id,
            presence: presence.get(user_id),
            fields,
            drafts: tracker.drafts(user_id).cloned().unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Connection;
    use formwatch_core::{FieldName, Identity, PresenceStatus};
    use std::time::Instant;
    use tokio::sync::mpsc;

    #[test]
    fn test_broadcast_status_reaches_admins() {
        let mut registry = ConnectionRegistry::new();
        let (tx, mut rx) = mpsc::channel(4);
        registry.register(Connection::new(Identity::admin(UserId::generate()), tx));

        let user = UserId::generate();
        let delivery = PresenceBroadcaster::broadcast_status(&registry, user, &PresenceState::Online);
        assert_eq!(delivery.sent, 1);

        let message = rx.try_recv().unwrap();
        let status: StatusEvent = message.data_as().unwrap();
        assert_eq!(status.user_id, user);
        assert_eq!(status.status, PresenceStatus::Online);
    }

    #[test]
    fn test_snapshot_all_users() {
        let mut presence = PresenceTable::new();
        let alice = UserId::generate();
        let bob = UserId::generate();
        presence.set(alice, PresenceState::Online);
        presence.set(bob, PresenceState::Offline);

        let snapshot = PresenceBroadcaster::snapshot_all_users(&presence);
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[&alice], PresenceState::Online);

        let reply = PresenceBroadcaster::all_user_status(&presence);
        assert_eq!(reply.users.len(), 2);
        assert!(reply.users.iter().any(|u| u.user_id == bob && u.status == PresenceStatus::Offline));
    }

    #[test]
    fn test_snapshot_user_with_sessions_and_drafts() {
        let mut presence = PresenceTable::new();
        let mut tracker = TypingTracker::default();
        let user = UserId::generate();
        let bio = FieldName::parse("bio").unwrap();
        let city = FieldName::parse("city").unwrap();

        tracker
            .touch(user, city.clone(), "Par".into(), Instant::now(), chrono::Utc::now())
            .unwrap();
        tracker.end(user, &city);
        tracker
            .touch(user, bio.clone(), "Hello".into(), Instant::now(), chrono::Utc::now())
            .unwrap();
        presence.set(user, PresenceState::Online);
        presence.reconcile(user, &tracker);

        let snapshot = PresenceBroadcaster::snapshot_user(&presence, &tracker, user);
        assert_eq!(snapshot.presence, PresenceState::Typing { field: bio.clone() });
        assert_eq!(snapshot.fields.len(), 1);
        assert_eq!(snapshot.fields[0].field, bio);
        assert_eq!(snapshot.fields[0].value, "Hello");
        assert_eq!(snapshot.drafts.get(&city).map(String::as_str), Some("Par"));
        assert_eq!(snapshot.drafts.get(&bio).map(String::as_str), Some("Hello"));
    }

    #[test]
    fn test_snapshot_unknown_user() {
        let snapshot = PresenceBroadcaster::snapshot_user(
            &PresenceTable::new(),
            &TypingTracker::default(),
            UserId::generate(),
        );
        assert_eq!(snapshot.presence, PresenceState::Offline);
        assert!(snapshot.fields.is_empty());
        assert!(snapshot.drafts.is_empty());
    }
}
