use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::Role;

/// Request payload for changing a member's role
#[derive(Serialize, Deserialize, ToSchema, Debug, Default)]
pub struct MemberRoleRequest {
    #[serde(default)]
    pub role: String,
}

/// Response returned after an owner action on a member
#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MemberUpdateResponse {
    pub room_id: String,
    pub user_id: String,
    /// The member's role after the action, absent when the entry was removed
    pub role: Option<Role>,
    pub owner_id: String,
}
