//! Error types for the room layer.
//!
//! The `Display` text of most variants is what the requesting client sees
//! in its `error` message, so it is written for players, not operators.

use konpira_protocol::{Phase, PlayerId, RoomId};

/// Errors that can occur during room operations.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// The room does not exist.
    #[error("room {0} not found")]
    NotFound(RoomId),

    /// Both seats are taken.
    #[error("Room is full")]
    RoomFull(RoomId),

    /// The player is already in this room.
    #[error("Player {0} is already in room {1}")]
    AlreadyInRoom(PlayerId, RoomId),

    /// The player is not in this room.
    #[error("Player {0} is not in room {1}")]
    NotInRoom(PlayerId, RoomId),

    /// The request belongs to another phase.
    #[error("Not in {expected} phase")]
    WrongPhase { expected: Phase, actual: Phase },

    /// The match has already been decided.
    #[error("Game is over")]
    GameOver,

    /// Only the current player may act.
    #[error("Not your turn")]
    NotYourTurn,

    /// The current player already acted this round.
    #[error("Action already taken this round")]
    AlreadyActed,

    /// The acting player tried to guess.
    #[error("You cannot guess your own action")]
    CannotGuessOwnAction,

    /// The guesser already guessed this round.
    #[error("Guess already made this round")]
    AlreadyGuessed,

    /// A post-game decision was already recorded for this player.
    #[error("Decision already recorded")]
    AlreadyDecided,

    /// A kick that breaks the kick rules.
    #[error("{0}")]
    KickNotAllowed(String),

    /// Giving up only makes sense while a match is running or being
    /// negotiated.
    #[error("Cannot give up in {0} phase")]
    CannotGiveUp(Phase),

    /// Restarting only makes sense after a match.
    #[error("Cannot restart in {0} phase")]
    CannotRestart(Phase),

    /// The room's command channel is full or closed.
    #[error("room {0} is unavailable")]
    Unavailable(RoomId),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_errors_name_the_expected_phase() {
        let err = RoomError::WrongPhase {
            expected: Phase::Action,
            actual: Phase::Guessing,
        };
        assert_eq!(err.to_string(), "Not in action phase");
        assert_eq!(
            RoomError::CannotRestart(Phase::Guessing).to_string(),
            "Cannot restart in guessing phase"
        );
    }

    #[test]
    fn test_player_facing_messages() {
        assert_eq!(RoomError::RoomFull(RoomId::new("r")).to_string(), "Room is full");
        assert_eq!(RoomError::NotYourTurn.to_string(), "Not your turn");
        assert_eq!(
            RoomError::KickNotAllowed("Only the winner can kick".into()).to_string(),
            "Only the winner can kick"
        );
    }
}
