//! Cancellable hub timers
//!
//! Each timer is a spawned task that sleeps and then posts a command back to
//! the hub. Timers hold only a weak sender, so pending timers never keep a
//! stopped hub's channel open.

use super::HubCommand;
use crate::connection::ConnectionId;
use formwatch_core::{FieldName, UserId};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc::WeakSender;
use tokio::task::AbortHandle;

type TimerKey = (UserId, FieldName);

/// A pending coalescing flush and the connection whose edit it carries
struct PendingFlush {
    handle: AbortHandle,
    origin: ConnectionId,
}

pub(super) struct TimerSet {
    commands: WeakSender<HubCommand>,
    idle: HashMap<TimerKey, AbortHandle>,
    flush: HashMap<TimerKey, PendingFlush>,
}

impl TimerSet {
    pub(super) fn new(commands: WeakSender<HubCommand>) -> Self {
        Self {
            commands,
            idle: HashMap::new(),
            flush: HashMap::new(),
        }
    }

    /// (Re)arm the idle timer of a session, replacing any pending one
    pub(super) fn arm_idle(
        &mut self,
        user_id: UserId,
        field: FieldName,
        generation: u64,
        after: Duration,
    ) {
        let handle = self.spawn(
            after,
            HubCommand::IdleExpired {
                user_id,
                field: field.clone(),
                generation,
            },
        );
        if let Some(previous) = self.idle.insert((user_id, field), handle) {
            previous.abort();
        }
    }

    /// Arm the flush timer of a session's coalescing window
    pub(super) fn arm_flush(
        &mut self,
        user_id: UserId,
        field: FieldName,
        serial: u64,
        origin: ConnectionId,
        after: Duration,
    ) {
        let handle = self.spawn(
            after,
            HubCommand::Flush {
                user_id,
                field: field.clone(),
                serial,
            },
        );
        if let Some(previous) = self
            .flush
            .insert((user_id, field), PendingFlush { handle, origin })
        {
            previous.handle.abort();
        }
    }

    /// Credit the buffered value to the connection that last edited it
    pub(super) fn retarget_flush(&mut self, user_id: UserId, field: &FieldName, origin: ConnectionId) {
        if let Some(pending) = self.flush.get_mut(&(user_id, field.clone())) {
            pending.origin = origin;
        }
    }

    /// Remove a pending flush, returning the origin of its buffered value
    pub(super) fn take_flush(&mut self, user_id: UserId, field: &FieldName) -> Option<ConnectionId> {
        let pending = self.flush.remove(&(user_id, field.clone()))?;
        pending.handle.abort();
        Some(pending.origin)
    }

    /// Cancel both timers of a session
    pub(super) fn cancel(&mut self, user_id: UserId, field: &FieldName) {
        if let Some(handle) = self.idle.remove(&(user_id, field.clone())) {
            handle.abort();
        }
        self.take_flush(user_id, field);
    }

    /// Cancel every timer of a user
    pub(super) fn cancel_user(&mut self, user_id: UserId) {
        self.idle.retain(|(owner, _), handle| {
            if *owner == user_id {
                handle.abort();
                false
            } else {
                true
            }
        });
        self.flush.retain(|(owner, _), pending| {
            if *owner == user_id {
                pending.handle.abort();
                false
            } else {
                true
            }
        });
    }

    pub(super) fn abort_all(&mut self) {
        for (_, handle) in self.idle.drain() {
            handle.abort();
        }
        for (_, pending) in self.flush.drain() {
            pending.handle.abort();
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.idle.len() + self.flush.len()
    }

    fn spawn(&self, after: Duration, command: HubCommand) -> AbortHandle {
        let commands = self.commands.clone();
        tokio::spawn(async move {
            tokio::time::sleep(after).await;
            if let Some(commands) = commands.upgrade() {
                let _ = commands.send(command).await;
            }
        })
        .abort_handle()
    }
}
