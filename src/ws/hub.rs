use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::channels::RoomChannels;
use super::notifier::Notifier;
use super::presence::{ConnId, PresenceDirectory};
use crate::models::{Connected, ServerEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HubStats {
    pub online_users: usize,
    pub connections: usize,
    pub room_channels: usize,
}

struct HubInner {
    open: bool,
    presence: PresenceDirectory,
    channels: RoomChannels,
}

impl HubInner {
    fn deliver(&self, conns: impl IntoIterator<Item = ConnId>, event: &ServerEvent) -> usize {
        let mut delivered = 0;
        for conn_id in conns {
            if let Some(conn) = self.presence.connection(conn_id) {
                // A closed receiver means the socket is going away; its cleanup will remove it.
                if conn.tx.send(event.clone()).is_ok() {
                    delivered += 1;
                }
            }
        }
        delivered
    }
}

/// Presence directory plus room channels for this process.
///
/// Constructed once at start-up and shared through the app state. `shutdown` drops every
/// connection and refuses new ones.
pub struct Hub {
    inner: RwLock<HubInner>,
    next_conn_id: AtomicU64,
}

impl Default for Hub {
    fn default() -> Self {
        Self::new()
    }
}

impl Hub {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HubInner {
                open: true,
                presence: PresenceDirectory::new(),
                channels: RoomChannels::new(),
            }),
            next_conn_id: AtomicU64::new(1),
        }
    }

    /// Register an authenticated connection for the user.
    ///
    /// The first event on the returned receiver is always `connected`. Returns None once the hub
    /// has been shut down.
    pub async fn connect(&self, user_id: &str) -> Option<(ConnId, UnboundedReceiver<ServerEvent>)> {
        let mut inner = self.inner.write().await;
        if !inner.open {
            return None;
        }
        let conn_id = self.next_conn_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = unbounded_channel();
        let _ = tx.send(ServerEvent::Connected(Connected {
            user_id: user_id.to_string(),
            connection_id: conn_id,
        }));
        inner.presence.add(conn_id, user_id, tx);
        info!(
            "Connection {} registered for user {} ({} live)",
            conn_id,
            user_id,
            inner.presence.connections_of(user_id).len()
        );
        Some((conn_id, rx))
    }

    pub async fn disconnect(&self, conn_id: ConnId) {
        let mut inner = self.inner.write().await;
        inner.channels.remove_connection(conn_id);
        if let Some(user_id) = inner.presence.remove(conn_id) {
            info!("Connection {} of user {} removed", conn_id, user_id);
        }
    }

    /// Returns false if the connection is unknown or was already subscribed
    pub async fn subscribe(&self, conn_id: ConnId, room_id: &str) -> bool {
        let mut inner = self.inner.write().await;
        if inner.presence.connection(conn_id).is_none() {
            return false;
        }
        inner.channels.subscribe(conn_id, room_id)
    }

    pub async fn unsubscribe(&self, conn_id: ConnId, room_id: &str) -> bool {
        self.inner.write().await.channels.unsubscribe(conn_id, room_id)
    }

    pub async fn send_to_connection(&self, conn_id: ConnId, event: ServerEvent) -> bool {
        self.inner.read().await.deliver([conn_id], &event) == 1
    }

    pub async fn emit_to_user(&self, user_id: &str, event: ServerEvent) -> usize {
        let inner = self.inner.read().await;
        let delivered = inner.deliver(inner.presence.connections_of(user_id), &event);
        debug!("{} delivered to {} connection(s) of user {}", event.name(), delivered, user_id);
        delivered
    }

    pub async fn broadcast(&self, room_id: &str, event: ServerEvent) -> usize {
        let inner = self.inner.read().await;
        let delivered = inner.deliver(inner.channels.subscribers(room_id), &event);
        debug!("{} broadcast to {} connection(s) in {}", event.name(), delivered, room_id);
        delivered
    }

    pub async fn stats(&self) -> HubStats {
        let inner = self.inner.read().await;
        HubStats {
            online_users: inner.presence.user_count(),
            connections: inner.presence.connection_count(),
            room_channels: inner.channels.channel_count(),
        }
    }

    pub async fn shutdown(&self) {
        let mut inner = self.inner.write().await;
        inner.open = false;
        let dropped = inner.presence.connection_count();
        inner.channels.clear();
        inner.presence.clear();
        info!("Hub shut down, {} connection(s) dropped", dropped);
    }
}

#[async_trait]
impl Notifier for Hub {
    async fn publish(&self, room_id: &str, event: ServerEvent) -> usize {
        self.broadcast(room_id, event).await
    }

    async fn publish_to_user(&self, user_id: &str, event: ServerEvent) -> usize {
        self.emit_to_user(user_id, event).await
    }

    async fn publish_to_room_and_users(&self, room_id: &str, user_ids: &[String], event: ServerEvent) -> usize {
        let inner = self.inner.read().await;
        let mut targets: BTreeSet<ConnId> = inner.channels.subscribers(room_id).into_iter().collect();
        for user_id in user_ids {
            targets.extend(inner.presence.connections_of(user_id));
        }
        let delivered = inner.deliver(targets, &event);
        debug!("{} delivered once to {} connection(s) for {}", event.name(), delivered, room_id);
        delivered
    }

    async fn close_room(&self, room_id: &str) {
        self.inner.write().await.channels.close_room(room_id);
    }
}
