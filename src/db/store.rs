use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Room, User};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("{0} already exists")]
    Duplicate(String),

    /// The aggregate changed since it was loaded
    #[error("Room '{0}' was saved by someone else since it was loaded")]
    VersionConflict(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Lookup keys for users
#[derive(Debug, Clone, Copy)]
pub enum UserField<'a> {
    Id(&'a str),
    Username(&'a str),
}

/// Lookup keys for rooms
#[derive(Debug, Clone, Copy)]
pub enum RoomField<'a> {
    RoomId(&'a str),
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_user_by(&self, field: UserField<'_>) -> Result<Option<User>, StoreError>;

    /// Related-user projection for membership listings. Unknown ids are skipped.
    async fn find_users_by_ids(&self, ids: &[String]) -> Result<Vec<User>, StoreError>;

    /// Fails with `Duplicate` when the username is taken
    async fn create_user(&self, user: User) -> Result<User, StoreError>;

    async fn save_user(&self, user: &User) -> Result<(), StoreError>;
}

#[async_trait]
pub trait RoomStore: Send + Sync {
    async fn find_room_by(&self, field: RoomField<'_>) -> Result<Option<Room>, StoreError>;

    /// Rooms the user owns or holds a membership entry in, oldest first
    async fn find_rooms_for_user(&self, user_id: &str) -> Result<Vec<Room>, StoreError>;

    async fn create_room(&self, room: Room) -> Result<Room, StoreError>;

    /// Whole-aggregate save. Succeeds only if the stored version still equals `room.version`;
    /// returns the room with its new version.
    async fn save_room(&self, room: &Room) -> Result<Room, StoreError>;

    /// Delete the room only if the stored version still equals `room.version`. Returns false if
    /// the room did not exist, `VersionConflict` if it changed since it was loaded.
    async fn delete_room(&self, room: &Room) -> Result<bool, StoreError>;
}
