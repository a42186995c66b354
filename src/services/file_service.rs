use chrono::Utc;
use tracing::{debug, info};

use crate::auth::auth;
use crate::models::{
    new_file_id, ApiError, AuthUser, FileAction, FileDeleteResponse, FileView, FilesUpdated, RoomFile, ServerEvent,
};
use crate::services::room_service::{file_views, load_room, update_room, Mutation};
use crate::state::AppState;

pub async fn create_file(state: &AppState, user: &AuthUser, room_id: &str, name: &str) -> Result<FileView, ApiError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ApiError::Validation("name is required".to_string()));
    }

    let (_, file) = update_room(state, room_id, |room| {
        auth::ensure_can_create_file(room, user)?;
        let file = RoomFile {
            file_id: new_file_id(),
            name: name.to_string(),
            created_at: Utc::now(),
            created_by: user.id.clone(),
        };
        room.files.push(file.clone());
        Ok(Mutation::Save(file))
    })
    .await?;
    info!("File {} ({}) created in room {} by {}", file.file_id, file.name, room_id, user.id);

    state
        .notifier
        .publish(
            room_id,
            ServerEvent::FilesUpdated(FilesUpdated {
                room_id: room_id.to_string(),
                file_id: Some(file.file_id.clone()),
                action: FileAction::Created,
            }),
        )
        .await;

    Ok(FileView {
        file_id: file.file_id,
        name: file.name,
        created_at: file.created_at,
        allowed: Vec::new(),
    })
}

/// Deleting a file that is already gone succeeds without touching storage, but still
/// broadcasts so stale mirrors converge.
pub async fn delete_file(
    state: &AppState,
    user: &AuthUser,
    room_id: &str,
    file_id: &str,
) -> Result<FileDeleteResponse, ApiError> {
    let (_, removed) = update_room(state, room_id, |room| {
        auth::ensure_can_delete_file(room, user)?;
        match room.files.iter().position(|f| f.file_id == file_id) {
            Some(idx) => {
                room.files.remove(idx);
                Ok(Mutation::Save(true))
            }
            None => Ok(Mutation::Skip(false)),
        }
    })
    .await?;

    if removed {
        info!("File {} deleted from room {} by {}", file_id, room_id, user.id);
    } else {
        debug!("File {} was already absent from room {}", file_id, room_id);
    }

    state
        .notifier
        .publish(
            room_id,
            ServerEvent::FilesUpdated(FilesUpdated {
                room_id: room_id.to_string(),
                file_id: Some(file_id.to_string()),
                action: FileAction::Deleted,
            }),
        )
        .await;

    Ok(FileDeleteResponse { success: true, removed })
}

pub async fn list_files(state: &AppState, room_id: &str) -> Result<Vec<FileView>, ApiError> {
    let room = load_room(state, room_id).await?;
    Ok(file_views(&room))
}
