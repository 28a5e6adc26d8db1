//! A single connection's session record.

use std::collections::BTreeSet;

use konpira_protocol::{PlayerId, RoomId, ServerMessage};
use konpira_transport::ConnectionId;
use tokio::sync::mpsc;

/// Channel for pushing server messages to one connection's writer task.
///
/// Unbounded so a room never waits on a slow client; a send to a closed
/// channel just fails and is ignored.
pub type OutboundSender = mpsc::UnboundedSender<ServerMessage>;

/// What the server knows about one live connection.
#[derive(Debug, Clone)]
pub struct Session {
    /// The transport-level id.
    pub conn_id: ConnectionId,

    /// The player id from this connection's first successful join.
    pub claimed: Option<PlayerId>,

    /// Rooms this connection currently participates in.
    pub rooms: BTreeSet<RoomId>,

    /// Where to deliver messages for this connection.
    pub outbound: OutboundSender,
}

impl Session {
    /// A fresh session with no identity and no rooms.
    pub fn new(conn_id: ConnectionId, outbound: OutboundSender) -> Self {
        Self {
            conn_id,
            claimed: None,
            rooms: BTreeSet::new(),
            outbound,
        }
    }

    /// Returns `true` if this connection sits in at least one room.
    pub fn in_any_room(&self) -> bool {
        !self.rooms.is_empty()
    }

    /// Returns `true` if `player_id` is the identity this connection claimed.
    pub fn is(&self, player_id: &PlayerId) -> bool {
        self.claimed.as_ref() == Some(player_id)
    }

    /// Pushes a message to this connection. Returns `false` if the
    /// connection's writer is gone.
    pub fn send(&self, msg: ServerMessage) -> bool {
        self.outbound.send(msg).is_ok()
    }
}
