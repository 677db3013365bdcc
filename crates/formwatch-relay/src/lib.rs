//! # formwatch-relay
//!
//! WebSocket relay forwarding field-level typing events and presence from
//! form users to the admins watching them.

pub mod broadcast;
pub mod connection;
pub mod error;
pub mod handlers;
pub mod hub;
pub mod protocol;
pub mod server;

pub use error::{RelayError, RelayResult};
pub use hub::{HubConfig, HubHandle, HubStats, RelayHub};
pub use server::{run, RelayServer};
