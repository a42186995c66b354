use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Response returned after force deleting a room
#[derive(Serialize, Deserialize, ToSchema, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RoomDeleteResponse {
    pub success: bool,
    /// Number of former members that were notified individually
    pub notified_members: usize,
}
