use async_trait::async_trait;

use crate::models::ServerEvent;

/// Fan-out collaborator. Delivery is at-most-once: an event addressed to nobody is dropped.
///
/// The in-process implementation is `Hub`; a multi-process deployment would back this with an
/// external broadcast layer without touching the services that publish.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver to every connection subscribed to the room channel. Returns the delivery count.
    async fn publish(&self, room_id: &str, event: ServerEvent) -> usize;

    /// Deliver to every live connection of the user. Returns the delivery count.
    async fn publish_to_user(&self, user_id: &str, event: ServerEvent) -> usize;

    /// Deliver to the room channel and to the listed users.
    ///
    /// Implementations that can see both sides deliver once per connection. The default falls back
    /// to the two primitive calls and may deliver twice to a user that is also subscribed.
    async fn publish_to_room_and_users(&self, room_id: &str, user_ids: &[String], event: ServerEvent) -> usize {
        let mut delivered = self.publish(room_id, event.clone()).await;
        for user_id in user_ids {
            delivered += self.publish_to_user(user_id, event.clone()).await;
        }
        delivered
    }

    /// Dissolve the room's channel once the room no longer exists
    async fn close_room(&self, _room_id: &str) {}
}
