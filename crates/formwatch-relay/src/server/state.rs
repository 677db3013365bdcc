//! Relay state
//!
//! Application state shared by the HTTP and WebSocket handlers.

use crate::hub::HubHandle;
use formwatch_common::{AppConfig, IdentityProvider};
use std::sync::Arc;

/// Relay application state
///
/// Holds only handles: all mutable relay state lives in the hub task.
#[derive(Clone)]
pub struct RelayState {
    /// Command channel into the hub
    hub: HubHandle,
    /// Validates handshake tokens
    identity: Arc<dyn IdentityProvider>,
    /// Application configuration
    config: Arc<AppConfig>,
}

impl RelayState {
    /// Create a new relay state
    pub fn new(hub: HubHandle, identity: Arc<dyn IdentityProvider>, config: AppConfig) -> Self {
        Self {
            hub,
            identity,
            config: Arc::new(config),
        }
    }

    /// Get the hub handle
    pub fn hub(&self) -> &HubHandle {
        &self.hub
    }

    /// Get the identity provider
    pub fn identity(&self) -> &dyn IdentityProvider {
        self.identity.as_ref()
    }

    /// Get the application configuration
    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}

impl std::fmt::Debug for RelayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayState")
            .field("hub", &self.hub)
            .field("config", &"AppConfig")
            .finish()
    }
}
