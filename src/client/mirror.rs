use std::sync::Arc;

use chrono::Utc;
use loro::event::DiffEvent;
use loro::{LoroDoc, LoroList, LoroMap, Subscription};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::reconcile::{reconcile_files, reconcile_members, FileMap, MemberMap};
use super::ClientError;
use crate::auth::auth;
use crate::models::{Role, RoomSnapshot};

const META_MAP: &str = "room-meta";
const MEMBERS_KEY: &str = "members";
const FILES_KEY: &str = "files";
const CHAT_LIST: &str = "chat";
const FILE_TEXT: &str = "content";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub user_id: String,
    pub text: String,
    pub sent_at: i64,
}

struct ActiveFile {
    file_id: String,
    doc: LoroDoc,
}

/// Client-held, eventually consistent copy of a room's members and files.
///
/// Both keys of the `room-meta` map hold a whole serialized value and are only ever replaced, never
/// patched. At most one per-file document is open at a time.
pub struct RoomMirror {
    room_id: String,
    doc: LoroDoc,
    active_file: Option<ActiveFile>,
}

impl RoomMirror {
    pub fn new(room_id: &str) -> Self {
        Self {
            room_id: room_id.to_string(),
            doc: LoroDoc::new(),
            active_file: None,
        }
    }

    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    pub fn doc(&self) -> &LoroDoc {
        &self.doc
    }

    fn meta(&self) -> LoroMap {
        self.doc.get_map(META_MAP)
    }

    fn read_key<T: for<'de> Deserialize<'de> + Default>(&self, key: &str) -> Result<T, ClientError> {
        let Some(value) = self.meta().get(key) else {
            return Ok(T::default());
        };
        let raw = value
            .as_value()
            .and_then(|v| v.as_string())
            .map(|s| s.to_string())
            .ok_or_else(|| ClientError::Mirror(format!("'{}' is not a string value", key)))?;
        Ok(serde_json::from_str(&raw)?)
    }

    fn write_key<T: Serialize>(&self, key: &str, value: &T) -> Result<(), ClientError> {
        let raw = serde_json::to_string(value)?;
        self.meta()
            .insert(key, raw)
            .map_err(|e| ClientError::Mirror(format!("Failed to write '{}': {}", key, e)))
    }

    pub fn members(&self) -> Result<MemberMap, ClientError> {
        self.read_key(MEMBERS_KEY)
    }

    pub fn files(&self) -> Result<FileMap, ClientError> {
        self.read_key(FILES_KEY)
    }

    pub fn role_of(&self, user_id: &str) -> Result<Option<Role>, ClientError> {
        Ok(self.members()?.get(user_id).and_then(|m| m.role.parse().ok()))
    }

    /// Reconcile against a fresh snapshot. Returns whether any key was rewritten.
    pub fn apply_snapshot(&mut self, snapshot: &RoomSnapshot) -> Result<bool, ClientError> {
        if snapshot.room_id != self.room_id {
            return Err(ClientError::Mirror(format!(
                "Snapshot of {} applied to mirror of {}",
                snapshot.room_id, self.room_id
            )));
        }

        let mut changed = false;
        if let Some(members) = reconcile_members(&self.members()?, &snapshot.members) {
            self.write_key(MEMBERS_KEY, &members)?;
            changed = true;
        }
        if let Some(files) = reconcile_files(&self.files()?, &snapshot.files) {
            self.write_key(FILES_KEY, &files)?;
            changed = true;
        }

        if changed {
            self.doc.commit();
            debug!("Mirror of {} updated from snapshot", self.room_id);
        }
        Ok(changed)
    }

    /// Client-only grant. Returns false if the file is unknown or the user already had access.
    pub fn grant_file_access(&mut self, file_id: &str, user_id: &str) -> Result<bool, ClientError> {
        let mut files = self.files()?;
        let Some(entry) = files.get_mut(file_id) else {
            return Ok(false);
        };
        if entry.allowed.iter().any(|a| a == user_id) {
            return Ok(false);
        }
        entry.allowed.push(user_id.to_string());
        self.write_key(FILES_KEY, &files)?;
        self.doc.commit();
        Ok(true)
    }

    pub fn can_open_file(&self, file_id: &str, user_id: &str) -> Result<bool, ClientError> {
        let files = self.files()?;
        let Some(entry) = files.get(file_id) else {
            return Ok(false);
        };
        Ok(auth::can_open_file(self.role_of(user_id)?, user_id, &entry.allowed))
    }

    /// Open the per-file document, closing whichever file was open before
    pub fn open_file(&mut self, file_id: &str, user_id: &str) -> Result<&LoroDoc, ClientError> {
        if !self.can_open_file(file_id, user_id)? {
            return Err(ClientError::Forbidden(format!(
                "User '{}' may not open file '{}'",
                user_id, file_id
            )));
        }
        if self.active_file.as_ref().is_some_and(|f| f.file_id != file_id) {
            self.close_file();
        }
        let active = self.active_file.get_or_insert_with(|| {
            let doc = LoroDoc::new();
            doc.get_text(FILE_TEXT);
            info!("Opened file {} in room mirror {}", file_id, self.room_id);
            ActiveFile {
                file_id: file_id.to_string(),
                doc,
            }
        });
        Ok(&active.doc)
    }

    pub fn active_file(&self) -> Option<&str> {
        self.active_file.as_ref().map(|f| f.file_id.as_str())
    }

    pub fn close_file(&mut self) {
        if let Some(file) = self.active_file.take() {
            debug!("Closed file {} in room mirror {}", file.file_id, self.room_id);
        }
    }

    /// Drop local room state after being kicked or after the room was deleted
    pub fn leave(&mut self) -> Result<(), ClientError> {
        self.close_file();
        let meta = self.meta();
        for key in [MEMBERS_KEY, FILES_KEY] {
            meta.delete(key)
                .map_err(|e| ClientError::Mirror(format!("Failed to clear '{}': {}", key, e)))?;
        }
        self.doc.commit();
        info!("Left room mirror {}", self.room_id);
        Ok(())
    }

    fn chat_list(&self) -> LoroList {
        self.doc.get_list(CHAT_LIST)
    }

    pub fn append_chat(&mut self, user_id: &str, text: &str) -> Result<ChatMessage, ClientError> {
        let message = ChatMessage {
            user_id: user_id.to_string(),
            text: text.to_string(),
            sent_at: Utc::now().timestamp_millis(),
        };
        self.chat_list()
            .push(serde_json::to_string(&message)?)
            .map_err(|e| ClientError::Mirror(format!("Failed to append chat message: {}", e)))?;
        self.doc.commit();
        Ok(message)
    }

    pub fn chat(&self) -> Result<Vec<ChatMessage>, ClientError> {
        let list = self.chat_list();
        let mut messages = Vec::with_capacity(list.len());
        for i in 0..list.len() {
            let raw = list
                .get(i)
                .and_then(|v| v.as_value().and_then(|v| v.as_string()).map(|s| s.to_string()))
                .ok_or_else(|| ClientError::Mirror(format!("Chat entry {} is not a string value", i)))?;
            messages.push(serde_json::from_str(&raw)?);
        }
        Ok(messages)
    }

    /// Call `on_change` after every committed change to the mirror. Dropping the subscription
    /// stops the callbacks.
    pub fn observe(&self, on_change: impl Fn() + Send + Sync + 'static) -> Subscription {
        self.doc
            .subscribe_root(Arc::new(move |_event: DiffEvent<'_>| on_change()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FileView, MemberView};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn snapshot(members: &[(&str, Role)], files: &[&str]) -> RoomSnapshot {
        RoomSnapshot {
            room_id: "room-00c0ffee".into(),
            owner_id: "owner".into(),
            metadata: serde_json::json!({}),
            created_at: Utc::now(),
            members: members
                .iter()
                .map(|(id, role)| MemberView {
                    user_id: id.to_string(),
                    username: format!("{}-name", id),
                    role: *role,
                    added_at: Utc::now(),
                })
                .collect(),
            files: files
                .iter()
                .map(|id| FileView {
                    file_id: id.to_string(),
                    name: format!("{}.md", id),
                    created_at: Utc::now(),
                    allowed: Vec::new(),
                })
                .collect(),
        }
    }

    #[test]
    fn applying_the_same_snapshot_twice_changes_nothing() {
        let mut mirror = RoomMirror::new("room-00c0ffee");
        let snap = snapshot(&[("owner", Role::Owner), ("bob", Role::Pending)], &["f1"]);
        assert!(mirror.apply_snapshot(&snap).unwrap());
        assert!(!mirror.apply_snapshot(&snap).unwrap());
        assert_eq!(mirror.role_of("bob").unwrap(), Some(Role::Pending));
        assert_eq!(mirror.files().unwrap().len(), 1);
    }

    #[test]
    fn snapshot_of_another_room_is_refused() {
        let mut mirror = RoomMirror::new("room-deadbeef");
        assert!(mirror.apply_snapshot(&snapshot(&[], &[])).is_err());
    }

    #[test]
    fn grants_survive_refresh_and_open_the_file() {
        let mut mirror = RoomMirror::new("room-00c0ffee");
        let snap = snapshot(&[("owner", Role::Owner), ("vera", Role::Viewer)], &["f1"]);
        mirror.apply_snapshot(&snap).unwrap();

        assert!(!mirror.can_open_file("f1", "vera").unwrap());
        assert!(matches!(mirror.open_file("f1", "vera"), Err(ClientError::Forbidden(_))));

        assert!(mirror.grant_file_access("f1", "vera").unwrap());
        assert!(!mirror.grant_file_access("f1", "vera").unwrap());
        assert!(!mirror.apply_snapshot(&snap).unwrap());
        assert!(mirror.open_file("f1", "vera").is_ok());
        assert_eq!(mirror.active_file(), Some("f1"));
    }

    #[test]
    fn only_one_file_is_open_at_a_time() {
        let mut mirror = RoomMirror::new("room-00c0ffee");
        mirror
            .apply_snapshot(&snapshot(&[("owner", Role::Owner)], &["f1", "f2"]))
            .unwrap();

        mirror.open_file("f1", "owner").unwrap();
        mirror.open_file("f2", "owner").unwrap();
        assert_eq!(mirror.active_file(), Some("f2"));

        mirror.leave().unwrap();
        assert_eq!(mirror.active_file(), None);
        assert!(mirror.members().unwrap().is_empty());
    }

    #[test]
    fn chat_is_append_only_and_observed() {
        let mut mirror = RoomMirror::new("room-00c0ffee");
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let _sub = mirror.observe(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        mirror.append_chat("owner", "hello").unwrap();
        mirror.append_chat("bob", "hi").unwrap();
        let chat = mirror.chat().unwrap();
        assert_eq!(chat.len(), 2);
        assert_eq!(chat[1].text, "hi");
        assert!(hits.load(Ordering::SeqCst) >= 1);
    }
}
