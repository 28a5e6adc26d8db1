//! Unified error type for the Konpira server.

use konpira_protocol::ProtocolError;
use konpira_room::RoomError;
use konpira_session::SessionError;
use konpira_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant auto-generates `From` impls, so
/// the `?` operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum KonpiraError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, invalid message).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session-level error (unknown connection, identity mismatch).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A room-level error (full, not found, wrong phase, ...).
    #[error(transparent)]
    Room(#[from] RoomError),

    /// Server configuration could not be read.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Handling a request panicked.
    #[error("internal error: {0}")]
    Internal(String),
}

impl KonpiraError {
    /// The text sent back to the requester in an `error` message.
    ///
    /// Game-rule rejections pass their own reason through. Anything the
    /// player cannot act on is reported as an internal error.
    pub fn client_message(&self) -> String {
        match self {
            Self::Protocol(e) => format!("Invalid message format: {e}"),
            Self::Session(
                SessionError::IdentityMismatch { .. } | SessionError::IdentityLocked { .. },
            ) => "Player ID mismatch".to_string(),
            Self::Room(RoomError::NotFound(_)) => "Room not found".to_string(),
            Self::Room(RoomError::Unavailable(_)) => "Internal server error".to_string(),
            Self::Room(e) => e.to_string(),
            Self::Transport(_)
            | Self::Session(_)
            | Self::InvalidConfig(_)
            | Self::Internal(_) => "Internal server error".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use konpira_protocol::{Phase, PlayerId, RoomId};
    use konpira_transport::ConnectionId;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::ConnectionClosed("gone".into());
        let konpira_err: KonpiraError = err.into();
        assert!(matches!(konpira_err, KonpiraError::Transport(_)));
        assert!(konpira_err.to_string().contains("gone"));
        assert_eq!(konpira_err.client_message(), "Internal server error");
    }

    #[test]
    fn test_protocol_error_reads_as_invalid_format() {
        let err = ProtocolError::InvalidMessage("bad".into());
        let konpira_err: KonpiraError = err.into();
        assert!(matches!(konpira_err, KonpiraError::Protocol(_)));
        assert!(
            konpira_err
                .client_message()
                .starts_with("Invalid message format: ")
        );
    }

    #[test]
    fn test_identity_errors_read_as_mismatch() {
        let mismatch: KonpiraError = SessionError::IdentityMismatch {
            claimed: PlayerId::new("bob"),
            actual: Some(PlayerId::new("alice")),
        }
        .into();
        let locked: KonpiraError = SessionError::IdentityLocked {
            current: PlayerId::new("alice"),
            requested: PlayerId::new("bob"),
        }
        .into();
        assert_eq!(mismatch.client_message(), "Player ID mismatch");
        assert_eq!(locked.client_message(), "Player ID mismatch");
    }

    #[test]
    fn test_unknown_connection_is_internal() {
        let err: KonpiraError = SessionError::UnknownConnection(ConnectionId::new(3)).into();
        assert_eq!(err.client_message(), "Internal server error");
    }

    #[test]
    fn test_room_errors_pass_their_reason_through() {
        let not_found: KonpiraError = RoomError::NotFound(RoomId::new("r1")).into();
        assert_eq!(not_found.client_message(), "Room not found");

        let turn: KonpiraError = RoomError::NotYourTurn.into();
        assert_eq!(turn.client_message(), "Not your turn");

        let phase: KonpiraError = RoomError::WrongPhase {
            expected: Phase::Guessing,
            actual: Phase::Action,
        }
        .into();
        assert_eq!(phase.client_message(), "Not in guessing phase");

        let gone: KonpiraError = RoomError::Unavailable(RoomId::new("r1")).into();
        assert_eq!(gone.client_message(), "Internal server error");
    }
}
