//! Room configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// A room never holds more than this many participants.
pub const MAX_PLAYERS: usize = 2;

// ---------------------------------------------------------------------------
// RoomConfig
// ---------------------------------------------------------------------------

/// Rules and timings shared by every room a registry creates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomConfig {
    /// A player whose `drinkLevel` reaches this loses on the spot.
    pub max_drink_level: u32,

    /// The match ends after this many validated rounds.
    pub round_limit: u32,

    /// How long the guesser has before being charged a drink.
    pub guess_time_limit: Duration,

    /// Pause between a validated round and the next `action` phase.
    pub round_pause: Duration,

    /// Delay between a rematch being agreed and its first round.
    pub restart_delay: Duration,

    /// Period of the `timerUpdate` countdown shown to clients.
    pub countdown_interval: Duration,

    /// Fixes where the box starts. `None` picks at random per game.
    pub initial_box_on_table: Option<bool>,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            max_drink_level: 10,
            round_limit: 10,
            guess_time_limit: Duration::from_millis(3000),
            round_pause: Duration::from_millis(2000),
            restart_delay: Duration::from_millis(1000),
            countdown_interval: Duration::from_secs(1),
            initial_box_on_table: None,
        }
    }
}

impl RoomConfig {
    /// Countdown ticks needed to cover `total`, rounded up.
    pub(crate) fn countdown_ticks(&self, total: Duration) -> u64 {
        let step = self.countdown_interval.as_millis().max(1);
        total.as_millis().div_ceil(step) as u64
    }
}
