//! Connection identity tracking for the Konpira game server.
//!
//! There is no authentication: a player is whoever a connection said it was
//! in its first `joinRoom`. This crate remembers that claim so later
//! requests from the same connection can be checked against it.
//!
//! # How it fits in the stack
//!
//! ```text
//! Router (above)  ← checks every request against the claimed identity
//!     ↕
//! Session Layer (this crate)  ← connection → player, rooms, outbound channel
//!     ↕
//! Protocol / Transport (below)  ← PlayerId, RoomId, ConnectionId
//! ```

mod error;
mod session;
mod table;

pub use error::SessionError;
pub use session::{OutboundSender, Session};
pub use table::SessionTable;
