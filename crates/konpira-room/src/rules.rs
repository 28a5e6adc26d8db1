//! The rules of Konpira, as pure functions over a [`GameState`].
//!
//! Nothing in here touches timers or channels. The [`Room`](crate::Room)
//! state machine calls these to decide what happened and then acts on it.

use konpira_protocol::{GameState, Move, PlayerState};

use crate::RoomConfig;

/// Returns `true` if `action` is the right reaction to the box placement.
///
/// Flat hand on the box when it is on the table, fist on the table when
/// it is not.
pub fn is_correct_action(box_on_table: bool, action: Move) -> bool {
    action == Move::expected_for(box_on_table)
}

/// Where the box is after `action`.
///
/// Only a correct `touchBox` moves it; a wrong move leaves it untouched.
pub fn box_after(box_on_table: bool, action: Move) -> bool {
    if action == Move::TouchBox && is_correct_action(box_on_table, action) {
        !box_on_table
    } else {
        box_on_table
    }
}

/// Returns `true` if the guesser has to drink for this guess.
///
/// A missing guess is not charged here; the guess timeout charges it.
pub fn guess_is_wrong(actual: Option<Move>, guess: Option<Move>) -> bool {
    matches!(guess, Some(g) if Some(g) != actual)
}

/// Returns `true` once a player's bottle is full.
pub fn is_bottle_full(player: &PlayerState, config: &RoomConfig) -> bool {
    player.drink_level >= config.max_drink_level
}

/// How a round (or an action penalty) leaves the match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Keep playing.
    Continue,
    /// The player at `loser` filled their bottle; the other one wins.
    BottleFull { loser: usize },
    /// The round limit was reached. `winner` is `None` for a draw.
    RoundLimit { winner: Option<usize> },
}

/// Judges the state after a round has been scored.
pub fn round_verdict(state: &GameState, config: &RoomConfig) -> Verdict {
    if let Some(loser) = state
        .players
        .iter()
        .position(|p| is_bottle_full(p, config))
    {
        return Verdict::BottleFull { loser };
    }

    if state.current_round >= config.round_limit {
        return Verdict::RoundLimit {
            winner: lowest_drinker(&state.players),
        };
    }

    Verdict::Continue
}

/// Index of the player with the strictly lowest drink level, if any.
fn lowest_drinker(players: &[PlayerState]) -> Option<usize> {
    let min = players.iter().map(|p| p.drink_level).min()?;
    let mut at_min = players
        .iter()
        .enumerate()
        .filter(|(_, p)| p.drink_level == min);
    let (idx, _) = at_min.next()?;
    match at_min.next() {
        Some(_) => None,
        None => Some(idx),
    }
}

/// The other seat in a two-player room.
pub fn opponent_of(idx: usize) -> usize {
    1 - idx.min(1)
}
