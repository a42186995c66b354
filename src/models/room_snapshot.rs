use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::Role;

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MemberView {
    pub user_id: String,
    pub username: String,
    pub role: Role,
    pub added_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FileView {
    pub file_id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    /// Per-file grants. Not modelled by the server yet, so always empty in server responses.
    #[serde(default)]
    pub allowed: Vec<String>,
}

/// Authoritative view of a room pulled by clients to refresh their mirror
#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RoomSnapshot {
    pub room_id: String,
    pub owner_id: String,
    #[schema(value_type = Object)]
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub members: Vec<MemberView>,
    pub files: Vec<FileView>,
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummary {
    pub room_id: String,
    pub owner_id: String,
    /// `none` when the caller owns the room but has not joined it yet
    pub role: String,
    pub created_at: DateTime<Utc>,
}
