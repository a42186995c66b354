use std::collections::{HashMap, HashSet};

use super::presence::ConnId;

/// Room multicast groups. Subscription is independent of room membership.
#[derive(Default, Debug)]
pub struct RoomChannels {
    rooms: HashMap<String, HashSet<ConnId>>,
    by_conn: HashMap<ConnId, HashSet<String>>,
}

impl RoomChannels {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if the connection was already subscribed
    pub fn subscribe(&mut self, conn_id: ConnId, room_id: &str) -> bool {
        let added = self.rooms.entry(room_id.to_string()).or_default().insert(conn_id);
        self.by_conn.entry(conn_id).or_default().insert(room_id.to_string());
        added
    }

    /// Returns false if the connection was not subscribed
    pub fn unsubscribe(&mut self, conn_id: ConnId, room_id: &str) -> bool {
        let removed = match self.rooms.get_mut(room_id) {
            Some(set) => {
                let removed = set.remove(&conn_id);
                if set.is_empty() {
                    self.rooms.remove(room_id);
                }
                removed
            }
            None => false,
        };
        if let Some(rooms) = self.by_conn.get_mut(&conn_id) {
            rooms.remove(room_id);
            if rooms.is_empty() {
                self.by_conn.remove(&conn_id);
            }
        }
        removed
    }

    pub fn remove_connection(&mut self, conn_id: ConnId) {
        if let Some(rooms) = self.by_conn.remove(&conn_id) {
            for room_id in rooms {
                if let Some(set) = self.rooms.get_mut(&room_id) {
                    set.remove(&conn_id);
                    if set.is_empty() {
                        self.rooms.remove(&room_id);
                    }
                }
            }
        }
    }

    pub fn subscribers(&self, room_id: &str) -> Vec<ConnId> {
        self.rooms
            .get(room_id)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Dissolve a room's group, e.g. after the room was deleted
    pub fn close_room(&mut self, room_id: &str) {
        if let Some(conns) = self.rooms.remove(room_id) {
            for conn_id in conns {
                if let Some(rooms) = self.by_conn.get_mut(&conn_id) {
                    rooms.remove(room_id);
                    if rooms.is_empty() {
                        self.by_conn.remove(&conn_id);
                    }
                }
            }
        }
    }

    pub fn channel_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn clear(&mut self) {
        self.rooms.clear();
        self.by_conn.clear();
    }
}
