//! Typing session tracking
//!
//! A typing session is the ephemeral record of one user editing one form field.
//! The tracker is a pure state machine: callers pass the current instant and
//! arm the idle and flush timers it asks for.

mod session;
mod typing;

pub use session::TypingSession;
pub use typing::{EndedSession, Touch, TouchKind, TypingTracker};
