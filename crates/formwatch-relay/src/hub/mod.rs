//! Relay hub
//!
//! A single task owns the connection registry, the typing tracker, the
//! presence table and every timer. Connection tasks and timers talk to it
//! only through [`HubCommand`]s; each command runs to completion before the
//! next one is read, so hub state is never shared or locked.

mod event_loop;
mod timers;

pub use event_loop::RelayHub;

use crate::connection::{Connection, ConnectionId};
use crate::error::{RelayError, RelayResult};
use crate::handlers::ClientRequest;
use formwatch_common::TypingConfig;
use formwatch_core::{FieldName, UserId};
use serde::Serialize;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

/// Commands consumed by the hub
#[derive(Debug)]
pub enum HubCommand {
    /// A handshake completed
    Connect(Connection),
    /// A connection's socket closed
    Disconnect { connection_id: ConnectionId },
    /// A validated request from a connection
    Inbound {
        connection_id: ConnectionId,
        request: ClientRequest,
    },
    /// An idle timer fired
    IdleExpired {
        user_id: UserId,
        field: FieldName,
        generation: u64,
    },
    /// A coalescing window closed
    Flush {
        user_id: UserId,
        field: FieldName,
        serial: u64,
    },
    /// Counters for health checks
    Stats(oneshot::Sender<HubStats>),
    /// Close every connection and stop
    Shutdown,
}

/// Timing knobs of the hub
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HubConfig {
    /// Silence after which a typing session ends
    pub idle_timeout: Duration,
    /// Minimum spacing between forwarded value updates of one field
    pub coalesce: Duration,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self::from(&TypingConfig::default())
    }
}

impl From<&TypingConfig> for HubConfig {
    fn from(config: &TypingConfig) -> Self {
        Self {
            idle_timeout: config.idle_timeout(),
            coalesce: config.coalesce_interval(),
        }
    }
}

/// Hub counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HubStats {
    pub connections: usize,
    pub users: usize,
    pub admins: usize,
    pub typing_sessions: usize,
}

/// Cloneable handle for sending commands to the hub
#[derive(Debug, Clone)]
pub struct HubHandle {
    commands: mpsc::Sender<HubCommand>,
}

impl HubHandle {
    fn new(commands: mpsc::Sender<HubCommand>) -> Self {
        Self { commands }
    }

    async fn send(&self, command: HubCommand) -> RelayResult<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| RelayError::HubUnavailable)
    }

    /// Register a connection whose handshake succeeded
    pub async fn connect(&self, connection: Connection) -> RelayResult<()> {
        self.send(HubCommand::Connect(connection)).await
    }

    /// Remove a connection
    pub async fn disconnect(&self, connection_id: ConnectionId) -> RelayResult<()> {
        self.send(HubCommand::Disconnect { connection_id }).await
    }

    /// Forward a validated request
    pub async fn inbound(
        &self,
        connection_id: ConnectionId,
        request: ClientRequest,
    ) -> RelayResult<()> {
        self.send(HubCommand::Inbound {
            connection_id,
            request,
        })
        .await
    }

    /// Read the hub counters
    ///
    /// The reply is produced after every command queued before it, so it
    /// doubles as a barrier.
    pub async fn stats(&self) -> RelayResult<HubStats> {
        let (tx, rx) = oneshot::channel();
        self.send(HubCommand::Stats(tx)).await?;
        rx.await.map_err(|_| RelayError::HubUnavailable)
    }

    /// Ask the hub to close all connections and stop
    pub async fn shutdown(&self) -> RelayResult<()> {
        self.send(HubCommand::Shutdown).await
    }
}
