use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::Role;

/// Request payload for joining a room
#[derive(Serialize, Deserialize, ToSchema, Debug, Default)]
pub struct RoomJoinRequest {
    #[serde(default)]
    pub password: String,
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RoomJoinResponse {
    pub room_id: String,
    pub role: Role,
}

/// The caller's role in a room; `none` when there is no membership
#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RoomRoleResponse {
    pub room_id: String,
    pub role: String,
}
