//! # Realtime Error Types

use std::io;
use thiserror::Error;

/// Result type alias for realtime operations.
pub type RealtimeResult<T> = Result<T, RealtimeError>;

/// Errors raised by the event hub.
///
/// Publishing an event never fails; these only come from starting,
/// stopping or encoding for the WebSocket hub.
#[derive(Debug, Error)]
pub enum RealtimeError {
    /// The hub could not bind its listener.
    ///
    /// ## When This Occurs
    /// - Port already in use (another ledger process on the same host)
    /// - Invalid bind address in `HubConfig`
    #[error("Failed to bind event hub to {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    /// An event could not be encoded as a JSON frame.
    #[error("Event serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The hub task has already stopped.
    #[error("Event hub is not running")]
    HubStopped,
}
