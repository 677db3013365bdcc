//! WebSocket close codes
//!
//! The relay only closes a connection itself on shutdown, prune, or a missed
//! keepalive. Malformed or unauthorized frames are dropped, never answered
//! with a close.

/// Relay WebSocket close codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum CloseCode {
    /// The relay dropped the connection (shutdown or pruned)
    GoingAway = 1001,
    /// Nothing received from the peer within the keepalive timeout
    KeepaliveTimeout = 4009,
}

impl CloseCode {
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// Reason text sent in the close frame
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::GoingAway => "Relay going away",
            Self::KeepaliveTimeout => "Keepalive timeout",
        }
    }
}

impl std::fmt::Display for CloseCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.as_u16(), self.description())
    }
}
