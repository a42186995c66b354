use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Request payload for creating a room
#[derive(Serialize, Deserialize, ToSchema, Debug, Default)]
pub struct RoomCreateRequest {
    /// Free-form metadata stored with the room
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub metadata: Option<serde_json::Value>,
}

/// Response returned after creating a room.
/// The plaintext credential is only ever returned here.
#[derive(Serialize, Deserialize, ToSchema, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RoomCreateResponse {
    pub room_id: String,
    pub password: String,
}
