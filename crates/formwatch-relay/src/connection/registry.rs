//! Connection registry
//!
//! Maps identities to their live connections. Owned by the hub task, so it is
//! plain maps with `&mut self` mutation and no interior locking.

use super::{Connection, ConnectionId};
use formwatch_core::UserId;
use std::collections::{HashMap, HashSet};

/// Result of registering a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registered {
    /// No other connection of this user was live; always false for admins
    pub first_for_user: bool,
}

/// A connection that has just been removed
#[derive(Debug)]
pub struct Unregistered {
    pub connection: Connection,
    /// No other connection of this user remains; always false for admins
    pub last_for_user: bool,
}

/// All live connections, indexed by id, by user, and by role
///
/// Only `user` role connections are indexed by user id. An admin session
/// sharing a subject with an end user is never one of that user's tabs.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    /// Active connections by ID
    connections: HashMap<ConnectionId, Connection>,

    /// End user ID to connection IDs mapping
    user_connections: HashMap<UserId, HashSet<ConnectionId>>,

    /// Connections with the admin role
    admins: HashSet<ConnectionId>,
}

impl ConnectionRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new connection
    pub fn register(&mut self, connection: Connection) -> Registered {
        let id = connection.id();
        let user_id = connection.user_id();

        let first_for_user = if connection.is_admin() {
            self.admins.insert(id);
            false
        } else {
            let sessions = self.user_connections.entry(user_id).or_default();
            let first = sessions.is_empty();
            sessions.insert(id);
            first
        };

        tracing::debug!(
            connection_id = %id,
            user_id = %user_id,
            role = %connection.role(),
            first_for_user,
            "Connection registered"
        );

        self.connections.insert(id, connection);

        Registered { first_for_user }
    }

    /// Remove a connection
    ///
    /// Returns `None` if the connection was already removed.
    pub fn unregister(&mut self, id: ConnectionId) -> Option<Unregistered> {
        let connection = self.connections.remove(&id)?;
        let user_id = connection.user_id();

        let last_for_user = if self.admins.remove(&id) {
            false
        } else {
            match self.user_connections.get_mut(&user_id) {
                Some(sessions) => {
                    sessions.remove(&id);
                    sessions.is_empty()
                }
                None => true,
            }
        };
        if last_for_user {
            self.user_connections.remove(&user_id);
        }

        tracing::debug!(
            connection_id = %id,
            user_id = %user_id,
            last_for_user,
            "Connection unregistered"
        );

        Some(Unregistered {
            connection,
            last_for_user,
        })
    }

    /// Get a connection by ID
    pub fn get(&self, id: ConnectionId) -> Option<&Connection> {
        self.connections.get(&id)
    }

    /// All admin connections
    pub fn find_admins(&self) -> Vec<&Connection> {
        self.admins
            .iter()
            .filter_map(|id| self.connections.get(id))
            .collect()
    }

    /// All `user` role connections of a user (tabs, devices)
    pub fn find_by_user_id(&self, user_id: UserId) -> Vec<&Connection> {
        self.user_connections
            .get(&user_id)
            .map(|ids| ids.iter().filter_map(|id| self.connections.get(id)).collect())
            .unwrap_or_default()
    }

    /// Get the total number of active connections
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Get the number of distinct connected end users
    pub fn user_count(&self) -> usize {
        self.user_connections.len()
    }

    /// Get the number of admin connections
    pub fn admin_count(&self) -> usize {
        self.admins.len()
    }

    /// Remove every connection, returning them
    pub fn drain(&mut self) -> Vec<Connection> {
        self.user_connections.clear();
        self.admins.clear();
        self.connections.drain().map(|(_, c)| c).collect()
    }
}
