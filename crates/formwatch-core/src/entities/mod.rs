//! Domain entities

mod identity;
mod presence;

pub use identity::{Identity, Role};
pub use presence::{PresenceState, PresenceStatus};
