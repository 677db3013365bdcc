//! # formwatch-core
//!
//! Domain layer containing identities, presence state, the typing session tracker,
//! and the events the relay emits when that state changes.
//! This crate has zero dependencies on infrastructure (transport, runtime, etc.).

pub mod entities;
pub mod error;
pub mod events;
pub mod presence;
pub mod tracker;
pub mod value_objects;

// Re-export commonly used types at crate root
pub use entities::{Identity, PresenceState, PresenceStatus, Role};
pub use error::DomainError;
pub use events::RelayEvent;
pub use presence::PresenceTable;
pub use tracker::{EndedSession, Touch, TouchKind, TypingSession, TypingTracker};
pub use value_objects::{FieldName, UserId, UserIdParseError, MAX_FIELD_NAME_LEN, MAX_FIELD_VALUE_LEN};
