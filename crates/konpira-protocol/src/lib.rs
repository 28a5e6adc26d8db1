//! Wire protocol for the Konpira game server.
//!
//! This crate defines the "language" that browser clients and the server
//! speak:
//!
//! - **Types** ([`PlayerId`], [`RoomId`], [`Move`], [`Phase`], ...): the
//!   vocabulary shared by every layer.
//! - **State** ([`GameState`]): the authoritative snapshot broadcast after
//!   every mutation.
//! - **Messages** ([`ClientMessage`], [`ServerMessage`]): one JSON object
//!   per frame, tagged by `"type"`.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how those messages become
//!   bytes.
//!
//! # Architecture
//!
//! ```text
//! Transport (bytes) → Protocol (ClientMessage) → Router → Room
//! Room → Protocol (ServerMessage) → Transport (bytes)
//! ```

mod codec;
mod error;
mod message;
mod state;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use message::{ClientMessage, PlayerDecision, ServerMessage};
pub use state::{GameState, PlayerState, PostGameState};
pub use types::{Decision, Move, Phase, PlayerId, PostGameDecision, Recipient, RoomId};
