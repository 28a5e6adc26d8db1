//! The authoritative game-state snapshot.
//!
//! Every mutation in a room is followed by a `gameState` broadcast carrying
//! a full clone of this struct. Clients never patch their local copy; they
//! replace it.

use serde::{Deserialize, Serialize};

use crate::{Move, Phase, PlayerId, PostGameDecision};

/// One player's slice of the game state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerState {
    pub id: PlayerId,
    /// Penalty counter. Starts at 0, only ever goes up within one match.
    pub drink_level: u32,
    /// The move this player made as actor this round.
    pub last_action: Option<Move>,
    /// This player's guess as the non-acting player this round.
    pub guess: Option<Move>,
    /// Only set while a finished match is being negotiated.
    pub post_game_decision: Option<PostGameDecision>,
}

impl PlayerState {
    /// A fresh player with no penalties and nothing recorded.
    pub fn new(id: PlayerId) -> Self {
        Self {
            id,
            drink_level: 0,
            last_action: None,
            guess: None,
            post_game_decision: None,
        }
    }

    /// Forgets this round's action and guess.
    pub fn clear_round(&mut self) {
        self.last_action = None;
        self.guess = None;
    }
}

/// Summary of a finished match, present only during `postGame`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostGameState {
    /// `None` for a draw.
    pub winner_id: Option<PlayerId>,
    pub loser_id: Option<PlayerId>,
    pub reason: String,
    pub waiting_for_decisions: bool,
}

/// The full, serializable state of one room's game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    /// Index into `players` of whoever acts this round.
    pub current_player_index: usize,
    /// The hidden fact the actor has to react to.
    pub box_on_table: bool,
    /// Mirrors the room's participants, in join order.
    pub players: Vec<PlayerState>,
    pub phase: Phase,
    pub round_number: u32,
    /// Always equal to `round_number`; both names are on the wire.
    pub current_round: u32,
    /// Milliseconds allotted to the current timed phase, 0 when untimed.
    pub round_timer: u64,
    pub is_game_over: bool,
    pub winner: Option<PlayerId>,
    pub post_game_state: Option<PostGameState>,
}

impl GameState {
    /// A fresh `waiting` state for the given players.
    pub fn new(players: &[PlayerId], box_on_table: bool) -> Self {
        Self {
            current_player_index: 0,
            box_on_table,
            players: players.iter().cloned().map(PlayerState::new).collect(),
            phase: Phase::Waiting,
            round_number: 1,
            current_round: 1,
            round_timer: 0,
            is_game_over: false,
            winner: None,
            post_game_state: None,
        }
    }

    /// Position of a player in `players`.
    pub fn player_index(&self, player_id: &PlayerId) -> Option<usize> {
        self.players.iter().position(|p| &p.id == player_id)
    }

    /// Looks a player up by id.
    pub fn player(&self, player_id: &PlayerId) -> Option<&PlayerState> {
        self.players.iter().find(|p| &p.id == player_id)
    }

    /// Index of the player who guesses this round.
    pub fn guesser_index(&self) -> usize {
        1 - self.current_player_index.min(1)
    }

    /// Ids of every player, in join order.
    pub fn player_ids(&self) -> Vec<PlayerId> {
        self.players.iter().map(|p| p.id.clone()).collect()
    }
}
