use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RoomRef {
    pub room_id: String,
}

impl RoomRef {
    pub fn new(room_id: &str) -> Self {
        Self {
            room_id: room_id.to_string(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FileAction {
    Created,
    Deleted,
}

#[skip_serializing_none]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FilesUpdated {
    pub room_id: String,
    pub file_id: Option<String>,
    pub action: FileAction,
}

/// Payload of the targeted membership notices
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RoomNotice {
    pub room_id: String,
    pub message: String,
}

impl RoomNotice {
    pub fn new(room_id: &str, message: impl Into<String>) -> Self {
        Self {
            room_id: room_id.to_string(),
            message: message.into(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Connected {
    pub user_id: String,
    pub connection_id: u64,
}

/// Messages sent by clients over the socket
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "event", content = "data")]
pub enum ClientMessage {
    #[serde(rename = "subscribeRoom")]
    SubscribeRoom(RoomRef),
    #[serde(rename = "unsubscribeRoom")]
    UnsubscribeRoom(RoomRef),
}

/// Events pushed by the server over the socket
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "event", content = "data")]
pub enum ServerEvent {
    #[serde(rename = "connected")]
    Connected(Connected),
    #[serde(rename = "subscribed")]
    Subscribed(RoomRef),
    #[serde(rename = "unsubscribed")]
    Unsubscribed(RoomRef),
    #[serde(rename = "members_updated")]
    MembersUpdated(RoomRef),
    #[serde(rename = "files_updated")]
    FilesUpdated(FilesUpdated),
    #[serde(rename = "approved")]
    Approved(RoomNotice),
    #[serde(rename = "rejected")]
    Rejected(RoomNotice),
    #[serde(rename = "kicked")]
    Kicked(RoomNotice),
    #[serde(rename = "room_deleted")]
    RoomDeleted(RoomNotice),
}

impl ServerEvent {
    /// Wire name of the event
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::Connected(_) => "connected",
            ServerEvent::Subscribed(_) => "subscribed",
            ServerEvent::Unsubscribed(_) => "unsubscribed",
            ServerEvent::MembersUpdated(_) => "members_updated",
            ServerEvent::FilesUpdated(_) => "files_updated",
            ServerEvent::Approved(_) => "approved",
            ServerEvent::Rejected(_) => "rejected",
            ServerEvent::Kicked(_) => "kicked",
            ServerEvent::RoomDeleted(_) => "room_deleted",
        }
    }

    /// The room the event concerns, if any
    pub fn room_id(&self) -> Option<&str> {
        match self {
            ServerEvent::Connected(_) => None,
            ServerEvent::Subscribed(r) | ServerEvent::Unsubscribed(r) | ServerEvent::MembersUpdated(r) => Some(&r.room_id),
            ServerEvent::FilesUpdated(f) => Some(&f.room_id),
            ServerEvent::Approved(n) | ServerEvent::Rejected(n) | ServerEvent::Kicked(n) | ServerEvent::RoomDeleted(n) => {
                Some(&n.room_id)
            }
        }
    }

    /// Whether a mirror of the event's room should pull a fresh snapshot
    pub fn needs_refresh(&self) -> bool {
        matches!(
            self,
            ServerEvent::MembersUpdated(_) | ServerEvent::FilesUpdated(_) | ServerEvent::Approved(_)
        )
    }
}
