//! Room registry: creates rooms on first join and drops them when empty.

use std::collections::HashMap;

use konpira_protocol::{PlayerId, RoomId};
use konpira_session::OutboundSender;

use crate::actor::spawn_room;
use crate::{RoomConfig, RoomError, RoomHandle, RoomInfo};

/// Default command channel size for room actors.
const DEFAULT_CHANNEL_SIZE: usize = 64;

/// Maps each room id to exactly one running room actor.
///
/// This is an explicit object rather than a global so the router (and each
/// test) owns an independent instance.
#[derive(Debug)]
pub struct RoomRegistry {
    config: RoomConfig,
    rooms: HashMap<RoomId, RoomHandle>,
}

impl RoomRegistry {
    /// Creates an empty registry whose rooms all use `config`.
    pub fn new(config: RoomConfig) -> Self {
        Self {
            config,
            rooms: HashMap::new(),
        }
    }

    /// The config new rooms are created with.
    pub fn config(&self) -> &RoomConfig {
        &self.config
    }

    /// Returns the room for `room_id`, spawning it if it does not exist.
    pub fn get_or_create(&mut self, room_id: &RoomId) -> RoomHandle {
        if let Some(handle) = self.rooms.get(room_id) {
            return handle.clone();
        }
        let handle = spawn_room(room_id.clone(), self.config.clone(), DEFAULT_CHANNEL_SIZE);
        self.rooms.insert(room_id.clone(), handle.clone());
        tracing::info!(%room_id, rooms = self.rooms.len(), "room created");
        handle
    }

    /// Returns the room for `room_id`, if it exists.
    pub fn get(&self, room_id: &RoomId) -> Option<RoomHandle> {
        self.rooms.get(room_id).cloned()
    }

    /// Returns `true` if the room exists.
    pub fn contains(&self, room_id: &RoomId) -> bool {
        self.rooms.contains_key(room_id)
    }

    /// Seats a player, creating the room if needed. Returns the new
    /// participant count.
    ///
    /// A room created for a join that then fails is dropped again.
    pub async fn join(
        &mut self,
        room_id: &RoomId,
        player_id: PlayerId,
        sender: OutboundSender,
    ) -> Result<usize, RoomError> {
        let created = !self.contains(room_id);
        let handle = self.get_or_create(room_id);
        match handle.join(player_id, sender).await {
            Ok(count) => Ok(count),
            Err(e) => {
                if created {
                    let _ = self.destroy(room_id).await;
                }
                Err(e)
            }
        }
    }

    /// Removes a player from a room and drops the room once it is empty.
    /// Returns the remaining participant count.
    pub async fn leave(&mut self, room_id: &RoomId, player_id: PlayerId) -> Result<usize, RoomError> {
        let handle = self
            .get(room_id)
            .ok_or_else(|| RoomError::NotFound(room_id.clone()))?;
        let remaining = handle.leave(player_id).await?;
        if remaining == 0 {
            self.destroy(room_id).await?;
        }
        Ok(remaining)
    }

    /// Returns info about one room.
    pub async fn room_info(&self, room_id: &RoomId) -> Result<RoomInfo, RoomError> {
        let handle = self
            .get(room_id)
            .ok_or_else(|| RoomError::NotFound(room_id.clone()))?;
        handle.info().await
    }

    /// Shuts a room down and forgets it.
    pub async fn destroy(&mut self, room_id: &RoomId) -> Result<(), RoomError> {
        let handle = self
            .rooms
            .remove(room_id)
            .ok_or_else(|| RoomError::NotFound(room_id.clone()))?;

        // The actor may already be gone; either way it is no longer ours.
        let _ = handle.shutdown().await;

        tracing::info!(%room_id, rooms = self.rooms.len(), "room destroyed");
        Ok(())
    }

    /// Returns the number of live rooms.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Lists all live room ids.
    pub fn room_ids(&self) -> Vec<RoomId> {
        self.rooms.keys().cloned().collect()
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new(RoomConfig::default())
    }
}
