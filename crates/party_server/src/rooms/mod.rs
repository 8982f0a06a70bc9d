//! Persisted party room records.
//!
//! A room record is the durable description of a watch party: its name, its
//! playlist and the user that owns it. It is independent of live presence;
//! a party id used on the presence channel does not need a stored record.
//!
//! [`RoomStore`] is the seam to a storage backend. [`InMemoryRoomStore`] is
//! the bundled adapter.

pub mod memory;

use async_trait::async_trait;
use party_events::UserId;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

pub use memory::InMemoryRoomStore;

/// Identifier of a stored room record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub Uuid);

impl RoomId {
    /// Generates a fresh random id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RoomId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A stored room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomRecord {
    pub id: RoomId,
    pub name: String,
    pub playlist: Vec<String>,
    /// The user that created the room; only the owner may change or delete it
    pub owner: UserId,
    /// Unix seconds
    pub created_at: u64,
    /// Unix seconds
    pub updated_at: u64,
}

/// Fields supplied when creating a room.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRoom {
    pub name: String,
    #[serde(default)]
    pub playlist: Vec<String>,
}

/// Partial update of a room; `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub playlist: Option<Vec<String>>,
}

/// Failures of a [`RoomStore`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomError {
    /// No record with this id exists
    #[error("Room not found: {0}")]
    NotFound(RoomId),

    /// The caller does not own the room
    #[error("Room {room} is not owned by {caller}")]
    Unauthorized { room: RoomId, caller: UserId },

    /// The backend failed
    #[error("Storage error: {0}")]
    Storage(String),
}

/// Storage backend for room records.
///
/// Mutations that target an existing record check ownership: a caller that
/// is not the record's owner gets [`RoomError::Unauthorized`] and the record
/// is left untouched.
#[async_trait]
pub trait RoomStore: Send + Sync {
    /// Stores a new room owned by `owner`.
    async fn create_room(&self, room: NewRoom, owner: &UserId) -> Result<RoomRecord, RoomError>;

    /// All rooms owned by `owner`, oldest first.
    async fn find_rooms_by_owner(&self, owner: &UserId) -> Result<Vec<RoomRecord>, RoomError>;

    /// Looks up a single room.
    async fn find_room_by_id(&self, id: RoomId) -> Result<Option<RoomRecord>, RoomError>;

    /// Applies `update` to a room owned by `caller`.
    async fn update_room(
        &self,
        id: RoomId,
        update: RoomUpdate,
        caller: &UserId,
    ) -> Result<RoomRecord, RoomError>;

    /// Deletes a room owned by `caller`, returning the removed record.
    async fn delete_room(&self, id: RoomId, caller: &UserId) -> Result<RoomRecord, RoomError>;
}
