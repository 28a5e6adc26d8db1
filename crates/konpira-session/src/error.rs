//! Error types for the session layer.

use konpira_protocol::PlayerId;
use konpira_transport::ConnectionId;

/// Errors that can occur while tracking connection identities.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The connection was never registered, or has already been removed.
    #[error("no session for connection {0}")]
    UnknownConnection(ConnectionId),

    /// A connection id was registered twice.
    #[error("connection {0} is already registered")]
    AlreadyRegistered(ConnectionId),

    /// The id in a request differs from the one the connection joined as
    /// (or the connection has not joined anything yet).
    #[error("player id mismatch: claimed {claimed}, session has {actual:?}")]
    IdentityMismatch {
        claimed: PlayerId,
        actual: Option<PlayerId>,
    },

    /// A connection sitting in a room tried to join under another name.
    #[error("connection already plays as {current}, cannot join as {requested}")]
    IdentityLocked {
        current: PlayerId,
        requested: PlayerId,
    },
}
