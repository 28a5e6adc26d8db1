//! The connection router: identity checks and request dispatch.
//!
//! Every connection handler shares one [`Router`]. It owns the session table
//! (who each connection claims to be) and the room registry, and turns each
//! decoded [`ClientMessage`] into a call on the right room actor.
//!
//! Rejections are answered with an `error` message to the requesting
//! connection only. The connection stays open.

use std::any::Any;
use std::panic::AssertUnwindSafe;

use futures_util::FutureExt;
use konpira_protocol::{
    ClientMessage, Codec, JsonCodec, PlayerId, ProtocolError, RoomId, ServerMessage,
};
use konpira_room::{PlayerRequest, RoomError, RoomInfo, RoomRegistry};
use konpira_session::{OutboundSender, SessionTable};
use konpira_transport::ConnectionId;
use tokio::sync::Mutex;

use crate::KonpiraError;

/// Routes client requests to rooms and keeps connection identities.
///
/// The registry and session locks are never held at the same time.
pub struct Router<C: Codec = JsonCodec> {
    rooms: Mutex<RoomRegistry>,
    sessions: Mutex<SessionTable>,
    codec: C,
}

impl Router<JsonCodec> {
    /// Creates a router over `registry`, speaking JSON.
    pub fn new(registry: RoomRegistry) -> Self {
        Self::with_codec(registry, JsonCodec)
    }
}

impl<C: Codec> Router<C> {
    /// Creates a router over `registry` with a custom codec.
    pub fn with_codec(registry: RoomRegistry, codec: C) -> Self {
        Self {
            rooms: Mutex::new(registry),
            sessions: Mutex::new(SessionTable::new()),
            codec,
        }
    }

    /// The codec used for inbound frames. Handlers use it for outbound ones.
    pub fn codec(&self) -> &C {
        &self.codec
    }

    /// Starts tracking a new connection whose messages go to `outbound`.
    ///
    /// # Errors
    /// [`KonpiraError::Session`] if the connection id is already known.
    pub async fn connect(
        &self,
        conn_id: ConnectionId,
        outbound: OutboundSender,
    ) -> Result<(), KonpiraError> {
        self.sessions.lock().await.register(conn_id, outbound)?;
        tracing::debug!(%conn_id, "connection registered");
        Ok(())
    }

    /// Decodes one inbound frame and handles it.
    pub async fn handle_raw(&self, conn_id: ConnectionId, data: &[u8]) {
        match self.codec.decode::<ClientMessage>(data) {
            Ok(msg) => self.handle(conn_id, msg).await,
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "malformed frame");
                self.reject(conn_id, &e.into()).await;
            }
        }
    }

    /// Handles one decoded request, answering failures to the sender.
    ///
    /// A panic while handling is caught here and reported as an internal
    /// error, so one bad request cannot take the connection down.
    pub async fn handle(&self, conn_id: ConnectionId, msg: ClientMessage) {
        let kind = msg.kind();
        let room_id = msg.room_id().clone();

        let result = match AssertUnwindSafe(self.dispatch(conn_id, msg))
            .catch_unwind()
            .await
        {
            Ok(result) => result,
            Err(panic) => {
                let reason = panic_message(panic.as_ref());
                tracing::warn!(%conn_id, %room_id, kind, reason = %reason, "request handler panicked");
                Err(KonpiraError::Internal(reason))
            }
        };

        if let Err(e) = result {
            tracing::debug!(%conn_id, %room_id, kind, error = %e, "request rejected");
            self.reject(conn_id, &e).await;
        }
    }

    /// Forgets a connection and removes its player from every room it was in.
    ///
    /// Rooms left empty are dropped from the registry.
    pub async fn disconnect(&self, conn_id: ConnectionId) {
        let Some(session) = self.sessions.lock().await.remove(conn_id) else {
            return;
        };
        let Some(player_id) = session.claimed else {
            return;
        };

        let mut rooms = self.rooms.lock().await;
        for room_id in &session.rooms {
            match rooms.leave(room_id, player_id.clone()).await {
                Ok(remaining) => {
                    tracing::info!(%conn_id, %room_id, %player_id, remaining, "player disconnected");
                }
                Err(e) => {
                    tracing::debug!(%conn_id, %room_id, %player_id, error = %e, "leave on disconnect failed");
                }
            }
        }
    }

    /// Number of live rooms.
    pub async fn room_count(&self) -> usize {
        self.rooms.lock().await.room_count()
    }

    /// Number of tracked connections.
    pub async fn session_count(&self) -> usize {
        self.sessions.lock().await.len()
    }

    /// Snapshot of one room.
    ///
    /// # Errors
    /// [`RoomError::NotFound`] if the room does not exist.
    pub async fn room_info(&self, room_id: &RoomId) -> Result<RoomInfo, KonpiraError> {
        let handle = self
            .rooms
            .lock()
            .await
            .get(room_id)
            .ok_or_else(|| RoomError::NotFound(room_id.clone()))?;
        Ok(handle.info().await?)
    }

    async fn dispatch(&self, conn_id: ConnectionId, msg: ClientMessage) -> Result<(), KonpiraError> {
        match msg {
            ClientMessage::JoinRoom { room_id, player_id } => {
                self.join(conn_id, room_id, player_id).await
            }
            other => self.forward(conn_id, other).await,
        }
    }

    async fn join(
        &self,
        conn_id: ConnectionId,
        room_id: RoomId,
        player_id: PlayerId,
    ) -> Result<(), KonpiraError> {
        let outbound = {
            let sessions = self.sessions.lock().await;
            sessions.check_claim(conn_id, &player_id)?;
            sessions.outbound(conn_id)?
        };

        let player_count = self
            .rooms
            .lock()
            .await
            .join(&room_id, player_id.clone(), outbound)
            .await?;

        let recorded =
            self.sessions
                .lock()
                .await
                .record_join(conn_id, player_id.clone(), room_id.clone());
        if let Err(e) = recorded {
            // The connection vanished while the room seated it.
            let _ = self.rooms.lock().await.leave(&room_id, player_id).await;
            return Err(e.into());
        }

        tracing::info!(%conn_id, %room_id, %player_id, player_count, "player joined room");
        Ok(())
    }

    /// Sends a non-join request to its room after the identity check.
    async fn forward(&self, conn_id: ConnectionId, msg: ClientMessage) -> Result<(), KonpiraError> {
        let room_id = msg.room_id().clone();
        let handle = self
            .rooms
            .lock()
            .await
            .get(&room_id)
            .ok_or_else(|| RoomError::NotFound(room_id.clone()))?;

        let player_id = msg.claimed_player().clone();
        self.sessions.lock().await.verify(conn_id, &player_id)?;

        let ack = handle.request(player_id, player_request(msg)?).await?;

        if !ack.detached.is_empty() {
            let mut sessions = self.sessions.lock().await;
            for detached in &ack.detached {
                sessions.detach(detached, &room_id);
            }
        }
        Ok(())
    }

    async fn reject(&self, conn_id: ConnectionId, err: &KonpiraError) {
        let delivered = self
            .sessions
            .lock()
            .await
            .send_to(conn_id, ServerMessage::error(err.client_message()));
        if !delivered {
            tracing::debug!(%conn_id, "error reply dropped, connection gone");
        }
    }
}

/// Maps a room-bound client message to the room's request type.
fn player_request(msg: ClientMessage) -> Result<PlayerRequest, ProtocolError> {
    Ok(match msg {
        ClientMessage::PlayerAction { action, .. } => PlayerRequest::Action(action),
        ClientMessage::PlayerGuess { guess, .. } => PlayerRequest::Guess(guess),
        ClientMessage::GiveUp { .. } => PlayerRequest::GiveUp,
        ClientMessage::RestartGame { .. } => PlayerRequest::Restart,
        ClientMessage::PostGameDecision { decision, .. } => PlayerRequest::Decision(decision),
        ClientMessage::KickPlayer {
            target_player_id, ..
        } => PlayerRequest::Kick {
            target: target_player_id,
        },
        ClientMessage::JoinRoom { .. } => {
            return Err(ProtocolError::InvalidMessage(
                "joinRoom is not a room request".into(),
            ));
        }
    })
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use konpira_protocol::{Decision, Move};

    fn target(msg: ClientMessage) -> PlayerRequest {
        player_request(msg).unwrap()
    }

    #[test]
    fn test_requests_map_to_room_operations() {
        let room_id = RoomId::new("r1");
        let player_id = PlayerId::new("a");

        assert_eq!(
            target(ClientMessage::PlayerAction {
                room_id: room_id.clone(),
                player_id: player_id.clone(),
                action: Move::TouchTable,
                timestamp: None,
            }),
            PlayerRequest::Action(Move::TouchTable)
        );
        assert_eq!(
            target(ClientMessage::PostGameDecision {
                room_id: room_id.clone(),
                player_id: player_id.clone(),
                decision: Decision::End,
            }),
            PlayerRequest::Decision(Decision::End)
        );
        assert_eq!(
            target(ClientMessage::KickPlayer {
                room_id: room_id.clone(),
                winner_id: player_id.clone(),
                target_player_id: PlayerId::new("b"),
            }),
            PlayerRequest::Kick {
                target: PlayerId::new("b")
            }
        );
        assert!(player_request(ClientMessage::JoinRoom { room_id, player_id }).is_err());
    }

    #[test]
    fn test_panic_message() {
        let from_str: Box<dyn Any + Send> = Box::new("boom");
        let from_string: Box<dyn Any + Send> = Box::new(String::from("bang"));
        let other: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(from_str.as_ref()), "boom");
        assert_eq!(panic_message(from_string.as_ref()), "bang");
        assert_eq!(panic_message(other.as_ref()), "unknown panic");
    }
}
