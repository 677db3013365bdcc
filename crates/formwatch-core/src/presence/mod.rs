//! Presence bookkeeping

mod table;

pub use table::PresenceTable;
