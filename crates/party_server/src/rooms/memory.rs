//! In-memory room store.

use super::{NewRoom, RoomError, RoomId, RoomRecord, RoomStore, RoomUpdate};
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use party_events::{current_timestamp, UserId};
use tracing::debug;

/// [`RoomStore`] backed by a concurrent map. Contents are lost on restart.
#[derive(Debug, Default)]
pub struct InMemoryRoomStore {
    rooms: DashMap<RoomId, RoomRecord>,
}

impl InMemoryRoomStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored rooms.
    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}

#[async_trait]
impl RoomStore for InMemoryRoomStore {
    async fn create_room(&self, room: NewRoom, owner: &UserId) -> Result<RoomRecord, RoomError> {
        let now = current_timestamp();
        let record = RoomRecord {
            id: RoomId::new(),
            name: room.name,
            playlist: room.playlist,
            owner: owner.clone(),
            created_at: now,
            updated_at: now,
        };

        match self.rooms.entry(record.id) {
            Entry::Occupied(_) => Err(RoomError::Storage(format!(
                "room id {} already in use",
                record.id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(record.clone());
                debug!(room_id = %record.id, owner = %owner, "Room created");
                Ok(record)
            }
        }
    }

    async fn find_rooms_by_owner(&self, owner: &UserId) -> Result<Vec<RoomRecord>, RoomError> {
        let mut rooms: Vec<RoomRecord> = self
            .rooms
            .iter()
            .filter(|entry| &entry.owner == owner)
            .map(|entry| entry.value().clone())
            .collect();
        rooms.sort_by_key(|room| room.created_at);
        Ok(rooms)
    }

    async fn find_room_by_id(&self, id: RoomId) -> Result<Option<RoomRecord>, RoomError> {
        Ok(self.rooms.get(&id).map(|entry| entry.value().clone()))
    }

    async fn update_room(
        &self,
        id: RoomId,
        update: RoomUpdate,
        caller: &UserId,
    ) -> Result<RoomRecord, RoomError> {
        let mut record = self.rooms.get_mut(&id).ok_or(RoomError::NotFound(id))?;
        if &record.owner != caller {
            return Err(RoomError::Unauthorized {
                room: id,
                caller: caller.clone(),
            });
        }

        if let Some(name) = update.name {
            record.name = name;
        }
        if let Some(playlist) = update.playlist {
            record.playlist = playlist;
        }
        record.updated_at = current_timestamp();
        Ok(record.value().clone())
    }

    async fn delete_room(&self, id: RoomId, caller: &UserId) -> Result<RoomRecord, RoomError> {
        match self.rooms.entry(id) {
            Entry::Vacant(_) => Err(RoomError::NotFound(id)),
            Entry::Occupied(entry) if &entry.get().owner != caller => Err(RoomError::Unauthorized {
                room: id,
                caller: caller.clone(),
            }),
            Entry::Occupied(entry) => {
                debug!(room_id = %id, "Room deleted");
                Ok(entry.remove())
            }
        }
    }
}
