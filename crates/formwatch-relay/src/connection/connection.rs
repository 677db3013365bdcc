//! Individual WebSocket connection
//!
//! The hub's view of a connection: who it belongs to and how to reach it.

use crate::protocol::Envelope;
use chrono::{DateTime, Utc};
use formwatch_core::{Identity, Role, UserId};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::time::Instant;
use uuid::Uuid;

/// Connection identifier (UUID v4)
pub type ConnectionId = Uuid;

/// Outcome of a non-blocking enqueue on a connection's outbound queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Queued for the writer task
    Queued,
    /// Queue full; the message was dropped for this recipient
    Full,
    /// Writer is gone; the connection is dead
    Closed,
}

/// A single registered connection
#[derive(Clone)]
pub struct Connection {
    /// Unique connection ID
    id: ConnectionId,

    /// Identity attached at handshake time
    identity: Identity,

    /// Channel to the connection's writer task
    sender: mpsc::Sender<Envelope>,

    /// Connection creation time
    connected_at: DateTime<Utc>,
}

impl Connection {
    /// Create a new connection with a fresh id
    pub fn new(identity: Identity, sender: mpsc::Sender<Envelope>) -> Self {
        Self {
            id: Uuid::new_v4(),
            identity,
            sender,
            connected_at: Utc::now(),
        }
    }

    /// Get the connection ID
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Get the authenticated identity
    pub fn identity(&self) -> Identity {
        self.identity
    }

    pub fn user_id(&self) -> UserId {
        self.identity.user_id
    }

    pub fn role(&self) -> Role {
        self.identity.role
    }

    pub fn is_admin(&self) -> bool {
        self.identity.is_admin()
    }

    pub fn connected_at(&self) -> DateTime<Utc> {
        self.connected_at
    }

    /// Enqueue a message without waiting
    pub fn try_send(&self, message: Envelope) -> SendOutcome {
        match self.sender.try_send(message) {
            Ok(()) => SendOutcome::Queued,
            Err(TrySendError::Full(_)) => SendOutcome::Full,
            Err(TrySendError::Closed(_)) => SendOutcome::Closed,
        }
    }

    /// Check if the writer side is gone
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("user_id", &self.identity.user_id)
            .field("role", &self.identity.role)
            .field("connected_at", &self.connected_at)
            .finish()
    }
}

/// Last time anything was heard from the peer
///
/// Shared between the socket reader (which touches it) and the writer
/// (which pings and enforces the keepalive timeout).
#[derive(Debug)]
pub struct Liveness {
    started: Instant,
    last_seen_ms: AtomicU64,
}

impl Liveness {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            started: Instant::now(),
            last_seen_ms: AtomicU64::new(0),
        })
    }

    /// Record inbound traffic
    pub fn touch(&self) {
        let elapsed = self.started.elapsed().as_millis() as u64;
        self.last_seen_ms.store(elapsed, Ordering::Relaxed);
    }

    /// Time since inbound traffic was last recorded
    pub fn idle_for(&self) -> Duration {
        let now = self.started.elapsed().as_millis() as u64;
        let last = self.last_seen_ms.load(Ordering::Relaxed);
        Duration::from_millis(now.saturating_sub(last))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connection_creation() {
        let (tx, _rx) = mpsc::channel(10);
        let user_id = UserId::generate();
        let conn = Connection::new(Identity::user(user_id), tx);

        assert_eq!(conn.user_id(), user_id);
        assert_eq!(conn.role(), Role::User);
        assert!(!conn.is_admin());
        assert!(!conn.is_closed());
    }

    #[tokio::test]
    async fn test_ids_are_unique() {
        let (tx, _rx) = mpsc::channel(10);
        let identity = Identity::admin(UserId::generate());

        let a = Connection::new(identity, tx.clone());
        let b = Connection::new(identity, tx);
        assert_ne!(a.id(), b.id());
    }

    #[tokio::test]
    async fn test_try_send_outcomes() {
        let (tx, mut rx) = mpsc::channel(1);
        let conn = Connection::new(Identity::user(UserId::generate()), tx);
        let message = Envelope::bare(crate::protocol::EventName::RequestAllUserStatus);

        assert_eq!(conn.try_send(message.clone()), SendOutcome::Queued);
        assert_eq!(conn.try_send(message.clone()), SendOutcome::Full);

        assert!(rx.recv().await.is_some());
        drop(rx);
        assert_eq!(conn.try_send(message), SendOutcome::Closed);
        assert!(conn.is_closed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_liveness() {
        let liveness = Liveness::new();
        tokio::time::advance(Duration::from_secs(5)).await;
        assert!(liveness.idle_for() >= Duration::from_secs(5));

        liveness.touch();
        assert!(liveness.idle_for() < Duration::from_secs(1));
    }
}
