//! Relay events - what the relay tells clients when presence or typing state changes

mod relay_event;

pub use relay_event::RelayEvent;
