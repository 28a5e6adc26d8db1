//! Inbound and outbound message envelopes.
//!
//! Each frame is one JSON object whose `"type"` field names the variant and
//! whose remaining fields are camelCase:
//!
//! ```text
//! {"type":"playerGuess","roomId":"r1","playerId":"bob","guess":"touchBox"}
//! ```

use serde::{Deserialize, Serialize};

use crate::{Decision, GameState, Move, Phase, PlayerId, PostGameDecision, RoomId};

// ---------------------------------------------------------------------------
// Client → Server
// ---------------------------------------------------------------------------

/// Everything a client may ask of the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    /// Enter (or lazily create) a room under a self-chosen name.
    JoinRoom { room_id: RoomId, player_id: PlayerId },

    /// The current player's move. `timestamp` is client wall-clock millis,
    /// informational only.
    PlayerAction {
        room_id: RoomId,
        player_id: PlayerId,
        action: Move,
        #[serde(default)]
        timestamp: Option<u64>,
    },

    /// The non-acting player's prediction of the move just made.
    PlayerGuess {
        room_id: RoomId,
        player_id: PlayerId,
        guess: Move,
    },

    /// Concede the match to the opponent.
    GiveUp { room_id: RoomId, player_id: PlayerId },

    /// Ask for a fresh match after the previous one ended.
    RestartGame { room_id: RoomId, player_id: PlayerId },

    /// Vote to continue or end after a finished match.
    PostGameDecision {
        room_id: RoomId,
        player_id: PlayerId,
        decision: Decision,
    },

    /// The winner removes the loser from the room.
    KickPlayer {
        room_id: RoomId,
        winner_id: PlayerId,
        target_player_id: PlayerId,
    },
}

impl ClientMessage {
    /// The room the request is addressed to.
    pub fn room_id(&self) -> &RoomId {
        match self {
            Self::JoinRoom { room_id, .. }
            | Self::PlayerAction { room_id, .. }
            | Self::PlayerGuess { room_id, .. }
            | Self::GiveUp { room_id, .. }
            | Self::RestartGame { room_id, .. }
            | Self::PostGameDecision { room_id, .. }
            | Self::KickPlayer { room_id, .. } => room_id,
        }
    }

    /// The identity the sender claims to act as.
    pub fn claimed_player(&self) -> &PlayerId {
        match self {
            Self::JoinRoom { player_id, .. }
            | Self::PlayerAction { player_id, .. }
            | Self::PlayerGuess { player_id, .. }
            | Self::GiveUp { player_id, .. }
            | Self::RestartGame { player_id, .. }
            | Self::PostGameDecision { player_id, .. } => player_id,
            Self::KickPlayer { winner_id, .. } => winner_id,
        }
    }

    /// The wire tag, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::JoinRoom { .. } => "joinRoom",
            Self::PlayerAction { .. } => "playerAction",
            Self::PlayerGuess { .. } => "playerGuess",
            Self::GiveUp { .. } => "giveUp",
            Self::RestartGame { .. } => "restartGame",
            Self::PostGameDecision { .. } => "postGameDecision",
            Self::KickPlayer { .. } => "kickPlayer",
        }
    }
}

// ---------------------------------------------------------------------------
// Server → Client
// ---------------------------------------------------------------------------

/// One entry of the per-player decision list in a `postGameState` message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerDecision {
    pub player_id: PlayerId,
    pub decision: PostGameDecision,
}

/// Everything the server pushes to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    /// Sent only to the joiner.
    RoomJoined {
        room_id: RoomId,
        player_id: PlayerId,
        player_count: usize,
    },

    /// A match is starting (second player arrived, or a rematch).
    GameStart { room_id: RoomId },

    /// Full snapshot after a mutation.
    GameState { state: GameState },

    /// Countdown for the UI; carries no authority.
    TimerUpdate { time_left: u64, phase: Phase },

    /// Status of post-game negotiation.
    PostGameState {
        winner_id: Option<PlayerId>,
        loser_id: Option<PlayerId>,
        reason: String,
        can_kick: bool,
        waiting_for_decisions: bool,
        player_decisions: Vec<PlayerDecision>,
    },

    /// Human-readable explanation of a room event (kick, end, departure).
    Notice { message: String },

    /// A rejected request. Only ever sent to the requester.
    Error { message: String },
}

impl ServerMessage {
    /// Shorthand for an [`ServerMessage::Error`].
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Shorthand for a [`ServerMessage::Notice`].
    pub fn notice(message: impl Into<String>) -> Self {
        Self::Notice {
            message: message.into(),
        }
    }
}
