//! # Konpira
//!
//! Server for a two-player bluffing game played over WebSockets.
//!
//! Each turn one player touches either the box or the table, and the
//! correct move depends on whether the box is on the table. The other
//! player guesses which move was made. Wrong moves and wrong guesses fill
//! the player's bottle. A full bottle, or the end of the round limit,
//! finishes the match.
//!
//! The server is authoritative: clients send intents as JSON frames, rooms
//! validate them and broadcast full state snapshots.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use konpira::prelude::*;
//!
//! # async fn run() -> Result<(), KonpiraError> {
//! let config = ServerConfig::from_env()?;
//! let server = KonpiraServer::builder()
//!     .bind(&config.bind_addr())
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod config;
mod error;
mod handler;
mod router;
mod server;

pub use config::ServerConfig;
pub use error::KonpiraError;
pub use router::Router;
pub use server::{KonpiraServer, KonpiraServerBuilder};

/// Everything needed to run or drive a server.
pub mod prelude {
    pub use crate::{KonpiraError, KonpiraServer, KonpiraServerBuilder, Router, ServerConfig};
    pub use konpira_protocol::{
        ClientMessage, Codec, Decision, GameState, JsonCodec, Move, Phase, PlayerId, RoomId,
        ServerMessage,
    };
    pub use konpira_room::{RoomConfig, RoomRegistry};
    pub use konpira_transport::ConnectionId;
}
