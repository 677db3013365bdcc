//! Event relay
//!
//! Routes outbound messages to admin connections and to a user's own
//! connections. Delivery is a non-blocking enqueue per recipient: best effort,
//! at most once, no acknowledgment.

use crate::connection::{Connection, ConnectionId, ConnectionRegistry, SendOutcome};
use crate::protocol::Envelope;
use formwatch_core::UserId;

/// What happened to one routed message
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Delivery {
    /// Recipients the message was queued for
    pub sent: usize,
    /// Recipients whose queue was full
    pub dropped: usize,
    /// Recipients whose writer is gone; the caller must prune them
    pub dead: Vec<ConnectionId>,
}

impl Delivery {
    fn record(&mut self, connection: &Connection, message: &Envelope) {
        match connection.try_send(message.clone()) {
            SendOutcome::Queued => self.sent += 1,
            SendOutcome::Full => {
                self.dropped += 1;
                tracing::warn!(
                    connection_id = %connection.id(),
                    user_id = %connection.user_id(),
                    event = %message.event,
                    "Outbound queue full, event dropped"
                );
            }
            SendOutcome::Closed => {
                tracing::debug!(
                    connection_id = %connection.id(),
                    event = %message.event,
                    "Outbound queue closed"
                );
                self.dead.push(connection.id());
            }
        }
    }

    /// Combine two deliveries
    pub fn merge(&mut self, other: Delivery) {
        self.sent += other.sent;
        self.dropped += other.dropped;
        self.dead.extend(other.dead);
    }
}

/// Routes messages over the connection registry
pub struct EventRelay;

impl EventRelay {
    /// Deliver to every registered admin connection
    pub fn route_to_admins(registry: &ConnectionRegistry, message: &Envelope) -> Delivery {
        let mut delivery = Delivery::default();
        for connection in registry.find_admins() {
            delivery.record(connection, message);
        }

        tracing::trace!(
            event = %message.event,
            sent = delivery.sent,
            "Message routed to admins"
        );

        delivery
    }

    /// Deliver to every connection of a user, optionally skipping the one the event came from
    pub fn route_to_user(
        registry: &ConnectionRegistry,
        user_id: UserId,
        message: &Envelope,
        exclude: Option<ConnectionId>,
    ) -> Delivery {
        let mut delivery = Delivery::default();
        for connection in registry.find_by_user_id(user_id) {
            if Some(connection.id()) == exclude {
                continue;
            }
            delivery.record(connection, message);
        }

        tracing::trace!(
            user_id = %user_id,
            event = %message.event,
            sent = delivery.sent,
            "Message routed to user connections"
        );

        delivery
    }

    /// Deliver to a single connection (snapshot replies)
    pub fn send_to(
        registry: &ConnectionRegistry,
        connection_id: ConnectionId,
        message: &Envelope,
    ) -> Delivery {
        let mut delivery = Delivery::default();
        if let Some(connection) = registry.get(connection_id) {
            delivery.record(connection, message);
        }
        delivery
    }
}
