use std::fmt;
use std::str::FromStr;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Role attached to a membership entry
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Owner,
    Editor,
    Member,
    Viewer,
    Pending,
}

impl Role {
    /// Pending is a placeholder awaiting the owner's decision and grants nothing.
    pub fn is_pending(&self) -> bool {
        matches!(self, Role::Pending)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Owner => "owner",
            Role::Editor => "editor",
            Role::Member => "member",
            Role::Viewer => "viewer",
            Role::Pending => "pending",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "owner" => Ok(Role::Owner),
            "editor" => Ok(Role::Editor),
            "member" => Ok(Role::Member),
            "viewer" => Ok(Role::Viewer),
            "pending" => Ok(Role::Pending),
            other => Err(format!("Unknown role '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Membership {
    pub user_id: String,
    pub role: Role,
    pub added_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RoomFile {
    pub file_id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
}

/// The authoritative room aggregate. Always loaded and saved as a whole.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub room_id: String,
    pub password_hash: String,
    pub owner_id: String,
    pub metadata: serde_json::Value,
    pub members: Vec<Membership>,
    pub files: Vec<RoomFile>,
    pub created_at: DateTime<Utc>,
    /// Bumped by the store on every successful save
    pub version: i64,
}

impl Room {
    pub fn new(room_id: String, password_hash: String, owner_id: String, metadata: serde_json::Value) -> Self {
        Self {
            room_id,
            password_hash,
            owner_id,
            metadata,
            members: Vec::new(),
            files: Vec::new(),
            created_at: Utc::now(),
            version: 0,
        }
    }

    pub fn membership(&self, user_id: &str) -> Option<&Membership> {
        self.members.iter().find(|m| m.user_id == user_id)
    }

    pub(crate) fn membership_mut(&mut self, user_id: &str) -> Option<&mut Membership> {
        self.members.iter_mut().find(|m| m.user_id == user_id)
    }

    pub fn role_of(&self, user_id: &str) -> Option<Role> {
        self.membership(user_id).map(|m| m.role)
    }

    pub fn is_owner(&self, user_id: &str) -> bool {
        self.owner_id == user_id
    }

    pub fn file(&self, file_id: &str) -> Option<&RoomFile> {
        self.files.iter().find(|f| f.file_id == file_id)
    }

    pub fn member_ids(&self) -> Vec<String> {
        self.members.iter().map(|m| m.user_id.clone()).collect()
    }

    /// At most one owner entry, and if present it belongs to `owner_id`.
    pub fn owner_invariant_holds(&self) -> bool {
        let owners: Vec<&Membership> = self.members.iter().filter(|m| m.role == Role::Owner).collect();
        match owners.as_slice() {
            [] => true,
            [only] => only.user_id == self.owner_id,
            _ => false,
        }
    }
}

/// Generate a room id of the form `room-xxxxxxxx`
pub fn new_room_id() -> String {
    let simple = uuid::Uuid::new_v4().simple().to_string();
    format!("room-{}", &simple[..8])
}

pub fn new_file_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
