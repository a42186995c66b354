//! Per-key shallow diff-and-replace of the room mirror against a server snapshot.
//!
//! Each function returns `None` when the mirror already matches, or the full replacement value for
//! the key when at least one entry differs or an id appeared or disappeared.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::{FileView, MemberView};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct MemberEntry {
    pub username: String,
    pub role: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    pub name: String,
    pub created_at: String,
    #[serde(default)]
    pub allowed: Vec<String>,
}

pub type MemberMap = BTreeMap<String, MemberEntry>;
pub type FileMap = BTreeMap<String, FileEntry>;

pub fn reconcile_members(current: &MemberMap, members: &[MemberView]) -> Option<MemberMap> {
    let next: MemberMap = members
        .iter()
        .map(|m| {
            (
                m.user_id.clone(),
                MemberEntry {
                    username: m.username.clone(),
                    role: m.role.to_string(),
                },
            )
        })
        .collect();
    (next != *current).then_some(next)
}

/// A mirror-held `allowed` set survives a refresh unless the server supplies a non-empty one
pub fn reconcile_files(current: &FileMap, files: &[FileView]) -> Option<FileMap> {
    let next: FileMap = files
        .iter()
        .map(|f| {
            let allowed = if f.allowed.is_empty() {
                current.get(&f.file_id).map(|e| e.allowed.clone()).unwrap_or_default()
            } else {
                f.allowed.clone()
            };
            (
                f.file_id.clone(),
                FileEntry {
                    name: f.name.clone(),
                    created_at: f.created_at.to_rfc3339(),
                    allowed,
                },
            )
        })
        .collect();
    (next != *current).then_some(next)
}
