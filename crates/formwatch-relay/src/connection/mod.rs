//! Connection management
//!
//! Live connections and the registry the hub keeps them in.

mod connection;
mod registry;

pub use connection::{Connection, ConnectionId, Liveness, SendOutcome};
pub use registry::{ConnectionRegistry, Registered, Unregistered};
