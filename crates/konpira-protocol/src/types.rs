//! Core vocabulary shared by every layer: identities, moves, phases.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A self-reported player name.
///
/// There is no authentication: the id is whatever the client sent in its
/// `joinRoom` request. `#[serde(transparent)]` keeps it a plain JSON string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub String);

impl PlayerId {
    /// Creates a player id from anything string-like.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrows the raw id.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PlayerId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// The shared key two players type in to meet in the same room.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub String);

impl RoomId {
    /// Creates a room id from anything string-like.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrows the raw id.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoomId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

// ---------------------------------------------------------------------------
// Recipient
// ---------------------------------------------------------------------------

/// Who inside a room should receive a server message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipient {
    /// Every participant in the room.
    All,
    /// One specific participant.
    Player(PlayerId),
    /// Every participant except the given one.
    AllExcept(PlayerId),
}

// ---------------------------------------------------------------------------
// Game vocabulary
// ---------------------------------------------------------------------------

/// What a hand does on its turn. Also the value a guesser predicts.
///
/// Deserialization only accepts `"touchBox"` and `"touchTable"`; any other
/// string is a decode error, never silently coerced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Move {
    /// Flat hand on the box.
    TouchBox,
    /// Fist on the bare table.
    TouchTable,
}

impl Move {
    /// The only correct move for the given box placement.
    pub fn expected_for(box_on_table: bool) -> Self {
        if box_on_table {
            Self::TouchBox
        } else {
            Self::TouchTable
        }
    }

    /// The other move.
    pub fn opposite(self) -> Self {
        match self {
            Self::TouchBox => Self::TouchTable,
            Self::TouchTable => Self::TouchBox,
        }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TouchBox => f.write_str("touchBox"),
            Self::TouchTable => f.write_str("touchTable"),
        }
    }
}

/// A decision a player submits once a match has finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Decision {
    /// Play another match with the same opponent.
    Continue,
    /// Close the session.
    End,
}

/// A player's recorded post-game decision, including "not decided yet".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PostGameDecision {
    Pending,
    Continue,
    End,
}

impl From<Decision> for PostGameDecision {
    fn from(decision: Decision) -> Self {
        match decision {
            Decision::Continue => Self::Continue,
            Decision::End => Self::End,
        }
    }
}

/// The stage a room's game is in.
///
/// ```text
/// waiting → action → guessing → validation ─┬→ action (next round)
///                                           └→ postGame ─┬→ action (rematch)
///                                                        └→ gameOver
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    Waiting,
    Action,
    Guessing,
    Validation,
    PostGame,
    GameOver,
}

impl Phase {
    /// Returns `true` while a match is being played (a round is underway).
    pub fn is_in_play(self) -> bool {
        matches!(self, Self::Action | Self::Guessing | Self::Validation)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Waiting => "waiting",
            Self::Action => "action",
            Self::Guessing => "guessing",
            Self::Validation => "validation",
            Self::PostGame => "postGame",
            Self::GameOver => "gameOver",
        };
        f.write_str(name)
    }
}
