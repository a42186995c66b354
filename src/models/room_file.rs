use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Request payload for creating a file
#[derive(Serialize, Deserialize, ToSchema, Debug, Default)]
pub struct FileCreateRequest {
    #[serde(default)]
    pub name: String,
}

/// Response returned after deleting a file
#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FileDeleteResponse {
    pub success: bool,
    /// False when the file was already absent
    pub removed: bool,
}
