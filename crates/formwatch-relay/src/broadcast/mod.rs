//! Event broadcasting
//!
//! Fan-out of relay events to admin connections and to a user's own sessions.

mod presence;
mod relay;

pub use presence::PresenceBroadcaster;
pub use relay::{Delivery, EventRelay};
