//! Hub event loop

use super::timers::TimerSet;
use super::{HubCommand, HubConfig, HubHandle, HubStats};
use crate::broadcast::{Delivery, EventRelay, PresenceBroadcaster};
use crate::connection::{Connection, ConnectionId, ConnectionRegistry};
use crate::handlers::{ClientRequest, ExplicitStatus};
use crate::protocol::Envelope;
use chrono::Utc;
use formwatch_core::{
    EndedSession, FieldName, PresenceState, PresenceTable, RelayEvent, TouchKind, TypingTracker,
    UserId,
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Owner of all relay state
pub struct RelayHub {
    config: HubConfig,
    commands: mpsc::Receiver<HubCommand>,
    registry: ConnectionRegistry,
    tracker: TypingTracker,
    presence: PresenceTable,
    timers: TimerSet,
    /// Connections found closed while routing; pruned after each command
    dead: Vec<ConnectionId>,
}

impl RelayHub {
    /// Create a hub and the handle used to reach it
    pub fn new(config: HubConfig, buffer: usize) -> (Self, HubHandle) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        let hub = Self {
            config,
            commands: rx,
            registry: ConnectionRegistry::new(),
            tracker: TypingTracker::new(config.coalesce),
            presence: PresenceTable::new(),
            timers: TimerSet::new(tx.downgrade()),
            dead: Vec::new(),
        };
        (hub, HubHandle::new(tx))
    }

    /// Create a hub and run it on a background task
    pub fn spawn(config: HubConfig, buffer: usize) -> (JoinHandle<()>, HubHandle) {
        let (hub, handle) = Self::new(config, buffer);
        (tokio::spawn(hub.run()), handle)
    }

    /// Process commands until shutdown or until every handle is dropped
    pub async fn run(mut self) {
        tracing::info!(
            idle_timeout_ms = self.config.idle_timeout.as_millis() as u64,
            coalesce_ms = self.config.coalesce.as_millis() as u64,
            "Relay hub started"
        );

        while let Some(command) = self.commands.recv().await {
            if matches!(command, HubCommand::Shutdown) {
                break;
            }
            self.handle(command);
            self.reap();
        }

        self.shutdown();
    }

    fn handle(&mut self, command: HubCommand) {
        match command {
            HubCommand::Connect(connection) => self.on_connect(connection),
            HubCommand::Disconnect { connection_id } => self.on_disconnect(connection_id),
            HubCommand::Inbound {
                connection_id,
                request,
            } => self.on_request(connection_id, request),
            HubCommand::IdleExpired {
                user_id,
                field,
                generation,
            } => self.on_idle_expired(user_id, &field, generation),
            HubCommand::Flush {
                user_id,
                field,
                serial,
            } => self.on_flush(user_id, field, serial),
            HubCommand::Stats(reply) => {
                let _ = reply.send(self.stats());
            }
            HubCommand::Shutdown => {}
        }
    }

    fn stats(&self) -> HubStats {
        HubStats {
            connections: self.registry.connection_count(),
            users: self.registry.user_count(),
            admins: self.registry.admin_count(),
            typing_sessions: self.tracker.session_count(),
        }
    }

    fn shutdown(&mut self) {
        self.timers.abort_all();
        // Dropping the senders makes every writer send a close frame
        let closed = self.registry.drain().len();
        tracing::info!(connections = closed, "Relay hub stopped");
    }

    // =========================================================================
    // Connection lifecycle
    // =========================================================================

    fn on_connect(&mut self, connection: Connection) {
        let identity = connection.identity();
        let connection_id = connection.id();
        let registered = self.registry.register(connection);

        tracing::info!(
            connection_id = %connection_id,
            user_id = %identity.user_id,
            role = %identity.role,
            "Connection joined"
        );

        if identity.is_admin() {
            return;
        }

        let user_id = identity.user_id;
        if registered.first_for_user {
            self.emit(RelayEvent::UserLoggedIn { user_id }, None);
        }
        if self.presence.get(user_id) == PresenceState::Offline {
            self.set_presence(user_id, PresenceState::Online);
        }
    }

    fn on_disconnect(&mut self, connection_id: ConnectionId) {
        let Some(unregistered) = self.registry.unregister(connection_id) else {
            return;
        };
        let identity = unregistered.connection.identity();

        tracing::info!(
            connection_id = %connection_id,
            user_id = %identity.user_id,
            last_for_user = unregistered.last_for_user,
            "Connection left"
        );

        if identity.is_admin() || !unregistered.last_for_user {
            return;
        }

        let user_id = identity.user_id;
        self.end_all_sessions(user_id);
        self.tracker.clear_drafts(user_id);
        self.set_presence(user_id, PresenceState::Offline);
    }

    /// Prune connections whose outbound queue was found closed
    fn reap(&mut self) {
        while let Some(connection_id) = self.dead.pop() {
            tracing::debug!(connection_id = %connection_id, "Pruning dead connection");
            self.on_disconnect(connection_id);
        }
    }

    // =========================================================================
    // Client requests
    // =========================================================================

    fn on_request(&mut self, connection_id: ConnectionId, request: ClientRequest) {
        let Some(identity) = self.registry.get(connection_id).map(Connection::identity) else {
            tracing::debug!(
                connection_id = %connection_id,
                request = request.kind(),
                "Request from unregistered connection dropped"
            );
            return;
        };
        let user_id = identity.user_id;

        tracing::trace!(
            connection_id = %connection_id,
            user_id = %user_id,
            request = request.kind(),
            "Handling request"
        );

        match request {
            ClientRequest::Typing { field, value } => {
                self.on_typing(user_id, field, value, connection_id);
            }
            ClientRequest::TypingEnd { field } => {
                self.on_typing_end(user_id, &field, connection_id);
            }
            ClientRequest::SetStatus(status) => self.on_status(user_id, status),
            ClientRequest::FormSaved { form_id } => {
                self.emit(RelayEvent::FormSaved { user_id, form_id }, Some(connection_id));
                self.tracker.clear_drafts(user_id);
            }
            ClientRequest::UserFormState { user_id: target } => {
                let snapshot =
                    PresenceBroadcaster::snapshot_user(&self.presence, &self.tracker, target);
                self.reply(connection_id, &Envelope::user_form_state(&snapshot));
            }
            ClientRequest::AllUserStatus => {
                let snapshot = PresenceBroadcaster::all_user_status(&self.presence);
                self.reply(connection_id, &Envelope::all_user_status(&snapshot));
            }
        }
    }

    fn on_typing(
        &mut self,
        user_id: UserId,
        field: FieldName,
        value: String,
        origin: ConnectionId,
    ) {
        let now = Instant::now().into_std();
        let touch = match self
            .tracker
            .touch(user_id, field.clone(), value.clone(), now, Utc::now())
        {
            Ok(touch) => touch,
            Err(e) => {
                tracing::debug!(user_id = %user_id, field = %field, error = %e, "Typing rejected");
                return;
            }
        };

        match touch.kind {
            TouchKind::Started => {
                let event = RelayEvent::TypingStarted {
                    user_id,
                    field: field.clone(),
                    value,
                };
                self.emit(event, Some(origin));
            }
            TouchKind::Forward => {
                let event = RelayEvent::TypingUpdated {
                    user_id,
                    field: field.clone(),
                    value,
                };
                self.emit(event, Some(origin));
            }
            TouchKind::Buffered { flush_in } => {
                self.timers
                    .arm_flush(user_id, field.clone(), touch.serial, origin, flush_in);
            }
            TouchKind::Coalesced => self.timers.retarget_flush(user_id, &field, origin),
            TouchKind::Unchanged => {}
        }

        self.timers
            .arm_idle(user_id, field, touch.generation, self.config.idle_timeout);
        self.reconcile(user_id);
    }

    fn on_typing_end(&mut self, user_id: UserId, field: &FieldName, origin: ConnectionId) {
        match self.tracker.end(user_id, field) {
            Some(ended) => self.finish(ended, Some(origin)),
            None => {
                tracing::debug!(user_id = %user_id, field = %field, "No session to end");
            }
        }
    }

    fn on_status(&mut self, user_id: UserId, status: ExplicitStatus) {
        match status {
            // A typing user stays typing
            ExplicitStatus::Online => {
                if self.presence.get(user_id) == PresenceState::Offline {
                    self.set_presence(user_id, PresenceState::Online);
                }
            }
            ExplicitStatus::Offline => {
                self.end_all_sessions(user_id);
                self.set_presence(user_id, PresenceState::Offline);
            }
        }
    }

    // =========================================================================
    // Timers
    // =========================================================================

    fn on_idle_expired(&mut self, user_id: UserId, field: &FieldName, generation: u64) {
        if let Some(ended) = self.tracker.expire(user_id, field, generation) {
            tracing::debug!(user_id = %user_id, field = %field, "Typing session idle");
            self.finish(ended, None);
        }
    }

    fn on_flush(&mut self, user_id: UserId, field: FieldName, serial: u64) {
        let now = Instant::now().into_std();
        if let Some(value) = self.tracker.flush(user_id, &field, serial, now) {
            let origin = self.timers.take_flush(user_id, &field);
            self.emit(
                RelayEvent::TypingUpdated {
                    user_id,
                    field,
                    value,
                },
                origin,
            );
        }
    }

    // =========================================================================
    // Session and presence transitions
    // =========================================================================

    /// Announce a removed session and move the presence label on
    fn finish(&mut self, ended: EndedSession, origin: Option<ConnectionId>) {
        let user_id = ended.session.user_id();
        self.announce_end(ended, origin);
        self.reconcile(user_id);
    }

    fn end_all_sessions(&mut self, user_id: UserId) {
        for ended in self.tracker.end_all(user_id) {
            self.announce_end(ended, None);
        }
        self.timers.cancel_user(user_id);
    }

    /// Flush any buffered value, then emit the end of the session
    ///
    /// Cancels the session's timers. The flushed value skips the connection
    /// that typed it.
    fn announce_end(&mut self, ended: EndedSession, origin: Option<ConnectionId>) {
        let user_id = ended.session.user_id();
        let field = ended.session.field().clone();

        let typed_by = self.timers.take_flush(user_id, &field);
        self.timers.cancel(user_id, &field);

        if let Some(value) = ended.flushed {
            let event = RelayEvent::TypingUpdated {
                user_id,
                field: field.clone(),
                value,
            };
            self.emit(event, typed_by.or(origin));
        }
        self.emit(RelayEvent::TypingEnded { user_id, field }, origin);
    }

    fn set_presence(&mut self, user_id: UserId, state: PresenceState) {
        if let Some(state) = self.presence.set(user_id, state) {
            self.emit(RelayEvent::StatusChanged { user_id, state }, None);
        }
    }

    fn reconcile(&mut self, user_id: UserId) {
        if let Some(state) = self.presence.reconcile(user_id, &self.tracker) {
            self.emit(RelayEvent::StatusChanged { user_id, state }, None);
        }
    }

    // =========================================================================
    // Delivery
    // =========================================================================

    /// Route an event to admins, and to the user's other sessions where it mirrors
    fn emit(&mut self, event: RelayEvent, origin: Option<ConnectionId>) {
        let mut delivery = match &event {
            RelayEvent::StatusChanged { user_id, state } => {
                PresenceBroadcaster::broadcast_status(&self.registry, *user_id, state)
            }
            _ => EventRelay::route_to_admins(&self.registry, &Envelope::from(&event)),
        };

        if event.mirrors_to_user() {
            delivery.merge(EventRelay::route_to_user(
                &self.registry,
                event.user_id(),
                &Envelope::from(&event),
                origin,
            ));
        }

        tracing::trace!(
            event = event.kind(),
            user_id = %event.user_id(),
            sent = delivery.sent,
            dropped = delivery.dropped,
            "Event emitted"
        );

        self.collect(delivery);
    }

    fn reply(&mut self, connection_id: ConnectionId, message: &Envelope) {
        let delivery = EventRelay::send_to(&self.registry, connection_id, message);
        self.collect(delivery);
    }

    fn collect(&mut self, delivery: Delivery) {
        self.dead.extend(delivery.dead);
    }
}
