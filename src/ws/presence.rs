use std::collections::{HashMap, HashSet};

use tokio::sync::mpsc::UnboundedSender;

use crate::models::ServerEvent;

pub type ConnId = u64;

/// A live socket as seen by the fan-out side
#[derive(Clone, Debug)]
pub struct Connection {
    pub user_id: String,
    pub tx: UnboundedSender<ServerEvent>,
}

/// Maps each user to the set of their live connections.
///
/// A user's entry exists only while it holds at least one connection.
#[derive(Default, Debug)]
pub struct PresenceDirectory {
    users: HashMap<String, HashSet<ConnId>>,
    connections: HashMap<ConnId, Connection>,
}

impl PresenceDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, conn_id: ConnId, user_id: &str, tx: UnboundedSender<ServerEvent>) {
        self.users.entry(user_id.to_string()).or_default().insert(conn_id);
        self.connections.insert(
            conn_id,
            Connection {
                user_id: user_id.to_string(),
                tx,
            },
        );
    }

    /// Returns the user the connection belonged to
    pub fn remove(&mut self, conn_id: ConnId) -> Option<String> {
        let conn = self.connections.remove(&conn_id)?;
        if let Some(set) = self.users.get_mut(&conn.user_id) {
            set.remove(&conn_id);
            if set.is_empty() {
                self.users.remove(&conn.user_id);
            }
        }
        Some(conn.user_id)
    }

    pub fn connections_of(&self, user_id: &str) -> Vec<ConnId> {
        self.users
            .get(user_id)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn connection(&self, conn_id: ConnId) -> Option<&Connection> {
        self.connections.get(&conn_id)
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Drops every connection handle, which ends their writer loops
    pub fn clear(&mut self) {
        self.users.clear();
        self.connections.clear();
    }
}
