//! Rooms for the Konpira game server.
//!
//! Each room runs as an isolated Tokio task (actor model) that owns a pure
//! [`Room`] state machine and the timers it arms.
//!
//! # Key types
//!
//! - [`Room`]: the game rules and phase transitions, free of I/O
//! - [`RoomHandle`]: send commands to a running room actor
//! - [`RoomRegistry`]: creates rooms lazily and drops them when empty
//! - [`RoomConfig`]: thresholds and timings

mod actor;
mod config;
mod error;
mod manager;
mod room;
pub mod rules;

pub use actor::{Ack, RoomHandle, RoomInfo};
pub use config::{MAX_PLAYERS, RoomConfig};
pub use error::RoomError;
pub use manager::RoomRegistry;
pub use room::{Effect, PlayerRequest, Room, Stamp, Timer, TimerKind};
