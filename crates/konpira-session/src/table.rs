//! The session table: every live connection and who it claims to be.
//!
//! # Concurrency note
//!
//! `SessionTable` is a plain `HashMap` and is not thread-safe by itself.
//! The router owns it behind a `tokio::sync::Mutex`.

use std::collections::HashMap;

use konpira_protocol::{PlayerId, RoomId, ServerMessage};
use konpira_transport::ConnectionId;

use crate::{OutboundSender, Session, SessionError};

/// Maps connections to their claimed identity, rooms, and outbound channel.
///
/// ## Lifecycle
///
/// ```text
/// register() ──→ record_join() ──→ verify() ... ──→ remove()
///                    │    ▲
///                    ▼    │
///               leave_room() / detach()
/// ```
#[derive(Debug, Default)]
pub struct SessionTable {
    sessions: HashMap<ConnectionId, Session>,
}

impl SessionTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts tracking a freshly accepted connection.
    ///
    /// # Errors
    /// [`SessionError::AlreadyRegistered`] if the id is already tracked.
    pub fn register(
        &mut self,
        conn_id: ConnectionId,
        outbound: OutboundSender,
    ) -> Result<(), SessionError> {
        if self.sessions.contains_key(&conn_id) {
            return Err(SessionError::AlreadyRegistered(conn_id));
        }
        self.sessions.insert(conn_id, Session::new(conn_id, outbound));
        tracing::debug!(%conn_id, "session registered");
        Ok(())
    }

    /// Stops tracking a connection and returns what was known about it.
    pub fn remove(&mut self, conn_id: ConnectionId) -> Option<Session> {
        let removed = self.sessions.remove(&conn_id);
        if let Some(session) = &removed {
            tracing::debug!(
                %conn_id,
                player_id = ?session.claimed,
                rooms = session.rooms.len(),
                "session removed"
            );
        }
        removed
    }

    /// Looks a session up.
    pub fn get(&self, conn_id: ConnectionId) -> Option<&Session> {
        self.sessions.get(&conn_id)
    }

    fn get_mut(&mut self, conn_id: ConnectionId) -> Result<&mut Session, SessionError> {
        self.sessions
            .get_mut(&conn_id)
            .ok_or(SessionError::UnknownConnection(conn_id))
    }

    /// Clones the outbound channel of a connection.
    ///
    /// # Errors
    /// [`SessionError::UnknownConnection`] if the connection is not tracked.
    pub fn outbound(&self, conn_id: ConnectionId) -> Result<OutboundSender, SessionError> {
        self.sessions
            .get(&conn_id)
            .map(|s| s.outbound.clone())
            .ok_or(SessionError::UnknownConnection(conn_id))
    }

    /// Sends a message straight to one connection. Returns `false` if the
    /// connection is unknown or its writer has gone away.
    pub fn send_to(&self, conn_id: ConnectionId, msg: ServerMessage) -> bool {
        self.sessions
            .get(&conn_id)
            .is_some_and(|s| s.send(msg))
    }

    /// Checks that `player_id` may join through this connection.
    ///
    /// A connection that already claimed an id and still sits in a room
    /// cannot switch names. One that left every room may.
    ///
    /// # Errors
    /// [`SessionError::UnknownConnection`] or [`SessionError::IdentityLocked`].
    pub fn check_claim(
        &self,
        conn_id: ConnectionId,
        player_id: &PlayerId,
    ) -> Result<(), SessionError> {
        let session = self
            .sessions
            .get(&conn_id)
            .ok_or(SessionError::UnknownConnection(conn_id))?;
        match &session.claimed {
            Some(current) if current != player_id && session.in_any_room() => {
                Err(SessionError::IdentityLocked {
                    current: current.clone(),
                    requested: player_id.clone(),
                })
            }
            _ => Ok(()),
        }
    }

    /// Records a successful join: the claimed id and the room.
    ///
    /// # Errors
    /// Same as [`check_claim`](Self::check_claim).
    pub fn record_join(
        &mut self,
        conn_id: ConnectionId,
        player_id: PlayerId,
        room_id: RoomId,
    ) -> Result<(), SessionError> {
        self.check_claim(conn_id, &player_id)?;
        let session = self.get_mut(conn_id)?;
        tracing::debug!(%conn_id, %player_id, %room_id, "identity claimed");
        session.claimed = Some(player_id);
        session.rooms.insert(room_id);
        Ok(())
    }

    /// Checks that a request's player id matches the connection's claim.
    ///
    /// # Errors
    /// [`SessionError::IdentityMismatch`] when it differs or nothing was
    /// claimed yet.
    pub fn verify(
        &self,
        conn_id: ConnectionId,
        claimed: &PlayerId,
    ) -> Result<(), SessionError> {
        let session = self
            .sessions
            .get(&conn_id)
            .ok_or(SessionError::UnknownConnection(conn_id))?;
        if session.is(claimed) {
            Ok(())
        } else {
            Err(SessionError::IdentityMismatch {
                claimed: claimed.clone(),
                actual: session.claimed.clone(),
            })
        }
    }

    /// Forgets that a connection is in a room. Returns `false` if it wasn't.
    pub fn leave_room(&mut self, conn_id: ConnectionId, room_id: &RoomId) -> bool {
        self.sessions
            .get_mut(&conn_id)
            .is_some_and(|s| s.rooms.remove(room_id))
    }

    /// Finds the connection playing as `player_id` in `room_id`.
    pub fn find(&self, player_id: &PlayerId, room_id: &RoomId) -> Option<ConnectionId> {
        self.sessions
            .values()
            .find(|s| s.is(player_id) && s.rooms.contains(room_id))
            .map(|s| s.conn_id)
    }

    /// Detaches a player from a room after the room removed them (a kick).
    ///
    /// Returns the affected connection, if any.
    pub fn detach(&mut self, player_id: &PlayerId, room_id: &RoomId) -> Option<ConnectionId> {
        let conn_id = self.find(player_id, room_id)?;
        self.leave_room(conn_id, room_id);
        tracing::debug!(%conn_id, %player_id, %room_id, "connection detached from room");
        Some(conn_id)
    }

    /// Number of tracked connections.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns `true` if no connection is tracked.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn conn(n: u64) -> ConnectionId {
        ConnectionId::new(n)
    }

    fn table_with(conns: &[u64]) -> SessionTable {
        let mut table = SessionTable::new();
        for &n in conns {
            table.register(conn(n), mpsc::unbounded_channel().0).unwrap();
        }
        table
    }

    #[test]
    fn test_register_twice_fails() {
        let mut table = table_with(&[1]);
        let err = table.register(conn(1), mpsc::unbounded_channel().0).unwrap_err();
        assert!(matches!(err, SessionError::AlreadyRegistered(_)));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_verify_before_join_is_a_mismatch() {
        let table = table_with(&[1]);
        let err = table.verify(conn(1), &PlayerId::new("alice")).unwrap_err();
        assert!(matches!(
            err,
            SessionError::IdentityMismatch { actual: None, .. }
        ));
    }

    #[test]
    fn test_verify_after_join() {
        let mut table = table_with(&[1]);
        table
            .record_join(conn(1), PlayerId::new("alice"), RoomId::new("r1"))
            .unwrap();
        assert!(table.verify(conn(1), &PlayerId::new("alice")).is_ok());
        assert!(table.verify(conn(1), &PlayerId::new("bob")).is_err());
    }

    #[test]
    fn test_unknown_connection() {
        let table = SessionTable::new();
        assert!(matches!(
            table.verify(conn(9), &PlayerId::new("x")),
            Err(SessionError::UnknownConnection(_))
        ));
        assert!(table.outbound(conn(9)).is_err());
    }

    #[test]
    fn test_identity_is_locked_while_in_a_room() {
        let mut table = table_with(&[1]);
        table
            .record_join(conn(1), PlayerId::new("alice"), RoomId::new("r1"))
            .unwrap();

        let err = table
            .record_join(conn(1), PlayerId::new("mallory"), RoomId::new("r2"))
            .unwrap_err();
        assert!(matches!(err, SessionError::IdentityLocked { .. }));

        // Same name, second room is fine.
        table
            .record_join(conn(1), PlayerId::new("alice"), RoomId::new("r2"))
            .unwrap();
        assert_eq!(table.get(conn(1)).unwrap().rooms.len(), 2);
    }

    #[test]
    fn test_identity_can_change_after_leaving_every_room() {
        let mut table = table_with(&[1]);
        table
            .record_join(conn(1), PlayerId::new("alice"), RoomId::new("r1"))
            .unwrap();
        assert!(table.leave_room(conn(1), &RoomId::new("r1")));
        assert!(table.check_claim(conn(1), &PlayerId::new("bob")).is_ok());
    }

    #[test]
    fn test_find_and_detach() {
        let mut table = table_with(&[1, 2]);
        table
            .record_join(conn(1), PlayerId::new("alice"), RoomId::new("r1"))
            .unwrap();
        table
            .record_join(conn(2), PlayerId::new("bob"), RoomId::new("r1"))
            .unwrap();

        assert_eq!(table.find(&PlayerId::new("bob"), &RoomId::new("r1")), Some(conn(2)));
        assert_eq!(table.detach(&PlayerId::new("bob"), &RoomId::new("r1")), Some(conn(2)));
        assert!(table.get(conn(2)).unwrap().rooms.is_empty());
        assert_eq!(table.find(&PlayerId::new("bob"), &RoomId::new("r1")), None);
    }

    #[test]
    fn test_send_to_delivers_and_reports_closed() {
        let mut table = SessionTable::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        table.register(conn(1), tx).unwrap();

        assert!(table.send_to(conn(1), ServerMessage::notice("hi")));
        assert_eq!(rx.try_recv().unwrap(), ServerMessage::notice("hi"));

        drop(rx);
        assert!(!table.send_to(conn(1), ServerMessage::notice("gone")));
        assert!(!table.send_to(conn(2), ServerMessage::notice("nobody")));
    }

    #[test]
    fn test_remove_returns_session() {
        let mut table = table_with(&[1]);
        table
            .record_join(conn(1), PlayerId::new("alice"), RoomId::new("r1"))
            .unwrap();
        let session = table.remove(conn(1)).unwrap();
        assert_eq!(session.claimed, Some(PlayerId::new("alice")));
        assert!(session.rooms.contains(&RoomId::new("r1")));
        assert!(table.is_empty());
        assert!(table.remove(conn(1)).is_none());
    }
}
