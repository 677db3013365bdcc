//! Relay errors

use thiserror::Error;

/// Errors raised by the relay runtime
#[derive(Debug, Error)]
pub enum RelayError {
    /// The hub task has stopped; commands can no longer be delivered
    #[error("Relay hub is not running")]
    HubUnavailable,

    #[error("Failed to bind to {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Server error: {0}")]
    Serve(#[source] std::io::Error),

    #[error("Server task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Relay result type
pub type RelayResult<T> = Result<T, RelayError>;
