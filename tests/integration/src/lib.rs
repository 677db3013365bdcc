//! Integration test utilities for the relay
//!
//! This crate provides helpers for running end-to-end tests against a relay
//! bound to an ephemeral local port, driven by real WebSocket clients.

pub mod fixtures;
pub mod helpers;

pub use fixtures::*;
pub use helpers::*;
