use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use super::store::{RoomField, RoomStore, StoreError, UserField, UserStore};
use crate::models::{Room, User};

/// In-process store used in development and tests
#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<String, User>>,
    rooms: RwLock<HashMap<String, Room>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_user_by(&self, field: UserField<'_>) -> Result<Option<User>, StoreError> {
        let users = self.users.read().await;
        let found = match field {
            UserField::Id(id) => users.get(id).cloned(),
            UserField::Username(name) => users.values().find(|u| u.username == name).cloned(),
        };
        Ok(found)
    }

    async fn find_users_by_ids(&self, ids: &[String]) -> Result<Vec<User>, StoreError> {
        let users = self.users.read().await;
        Ok(ids.iter().filter_map(|id| users.get(id).cloned()).collect())
    }

    async fn create_user(&self, user: User) -> Result<User, StoreError> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.username == user.username) {
            return Err(StoreError::Duplicate(format!("User '{}'", user.username)));
        }
        if users.contains_key(&user.id) {
            return Err(StoreError::Duplicate(format!("User id '{}'", user.id)));
        }
        users.insert(user.id.clone(), user.clone());
        Ok(user)
    }

    async fn save_user(&self, user: &User) -> Result<(), StoreError> {
        let mut users = self.users.write().await;
        match users.get_mut(&user.id) {
            Some(stored) => {
                *stored = user.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound(format!("User '{}'", user.id))),
        }
    }
}

#[async_trait]
impl RoomStore for MemoryStore {
    async fn find_room_by(&self, field: RoomField<'_>) -> Result<Option<Room>, StoreError> {
        let rooms = self.rooms.read().await;
        let found = match field {
            RoomField::RoomId(id) => rooms.get(id).cloned(),
        };
        Ok(found)
    }

    async fn find_rooms_for_user(&self, user_id: &str) -> Result<Vec<Room>, StoreError> {
        let rooms = self.rooms.read().await;
        let mut found: Vec<Room> = rooms
            .values()
            .filter(|r| r.owner_id == user_id || r.membership(user_id).is_some())
            .cloned()
            .collect();
        found.sort_by_key(|r| r.created_at);
        Ok(found)
    }

    async fn create_room(&self, room: Room) -> Result<Room, StoreError> {
        let mut rooms = self.rooms.write().await;
        if rooms.contains_key(&room.room_id) {
            return Err(StoreError::Duplicate(format!("Room '{}'", room.room_id)));
        }
        rooms.insert(room.room_id.clone(), room.clone());
        Ok(room)
    }

    async fn save_room(&self, room: &Room) -> Result<Room, StoreError> {
        let mut rooms = self.rooms.write().await;
        let stored = rooms
            .get_mut(&room.room_id)
            .ok_or_else(|| StoreError::NotFound(format!("Room '{}'", room.room_id)))?;
        if stored.version != room.version {
            debug!(
                "Rejecting stale save of room {} (base version {}, stored {})",
                room.room_id, room.version, stored.version
            );
            return Err(StoreError::VersionConflict(room.room_id.clone()));
        }
        let mut saved = room.clone();
        saved.version += 1;
        *stored = saved.clone();
        Ok(saved)
    }

    async fn delete_room(&self, room: &Room) -> Result<bool, StoreError> {
        let mut rooms = self.rooms.write().await;
        match rooms.get(&room.room_id) {
            None => Ok(false),
            Some(stored) if stored.version != room.version => {
                debug!(
                    "Rejecting stale delete of room {} (base version {}, stored {})",
                    room.room_id, room.version, stored.version
                );
                Err(StoreError::VersionConflict(room.room_id.clone()))
            }
            Some(_) => Ok(rooms.remove(&room.room_id).is_some()),
        }
    }
}
