use std::collections::HashMap;

use chrono::Utc;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::auth::auth;
use crate::auth::credentials::generate_room_password;
use crate::db::{RoomField, StoreError};
use crate::models::{
    new_room_id, ApiError, AuthUser, FileView, JoinOutcome, MemberUpdateResponse, MemberView, Role, Room,
    RoomCreateResponse, RoomDeleteResponse, RoomJoinResponse, RoomNotice, RoomRef, RoomRoleResponse, RoomSnapshot,
    RoomSummary, ServerEvent,
};
use crate::state::AppState;

const ROOM_ID_ATTEMPTS: usize = 3;

/// What a room mutation decided to do with the loaded aggregate
pub enum Mutation<T> {
    /// Persist the mutated room, then hand back the value
    Save(T),
    /// Nothing changed, skip the write
    Skip(T),
}

pub async fn load_room(state: &AppState, room_id: &str) -> Result<Room, ApiError> {
    state
        .rooms
        .find_room_by(RoomField::RoomId(room_id))
        .await?
        .ok_or_else(|| ApiError::room_not_found(room_id))
}

/// Load, mutate and save a room, reloading and reapplying when a concurrent writer got there
/// first. Authority checks belong inside `apply` so they run against the fresh aggregate.
pub async fn update_room<T, F>(state: &AppState, room_id: &str, mut apply: F) -> Result<(Room, T), ApiError>
where
    F: FnMut(&mut Room) -> Result<Mutation<T>, ApiError> + Send,
    T: Send,
{
    let retries = state.config.room_save_retries;
    for attempt in 0..=retries {
        let mut room = load_room(state, room_id).await?;
        match apply(&mut room)? {
            Mutation::Skip(out) => return Ok((room, out)),
            Mutation::Save(out) => match state.rooms.save_room(&room).await {
                Ok(saved) => return Ok((saved, out)),
                Err(StoreError::VersionConflict(_)) => {
                    warn!("Room {} changed underneath us (attempt {}/{})", room_id, attempt + 1, retries + 1);
                }
                Err(StoreError::NotFound(_)) => return Err(ApiError::room_not_found(room_id)),
                Err(e) => return Err(e.into()),
            },
        }
    }
    Err(StoreError::VersionConflict(room_id.to_string()).into())
}

pub async fn create_room(
    state: &AppState,
    user: &AuthUser,
    metadata: Option<serde_json::Value>,
) -> Result<RoomCreateResponse, ApiError> {
    let password = generate_room_password();
    let password_hash = state.credentials.hash(&password).map_err(ApiError::Internal)?;
    let metadata = metadata.unwrap_or_else(|| json!({}));

    for _ in 0..ROOM_ID_ATTEMPTS {
        let room = Room::new(new_room_id(), password_hash.clone(), user.id.clone(), metadata.clone());
        match state.rooms.create_room(room).await {
            Ok(room) => {
                info!("Room {} created by {}", room.room_id, user.id);
                return Ok(RoomCreateResponse {
                    room_id: room.room_id,
                    password,
                });
            }
            Err(StoreError::Duplicate(what)) => debug!("{} already taken, drawing another id", what),
            Err(e) => return Err(e.into()),
        }
    }
    Err(ApiError::Internal("Could not allocate a unique room id".to_string()))
}

pub async fn join_room(
    state: &AppState,
    user: &AuthUser,
    room_id: &str,
    password: &str,
) -> Result<RoomJoinResponse, ApiError> {
    if password.is_empty() {
        return Err(ApiError::Validation("password is required".to_string()));
    }

    let room = load_room(state, room_id).await?;
    if !state.credentials.verify(password, &room.password_hash) {
        warn!("User {} presented a wrong credential for room {}", user.id, room_id);
        return Err(ApiError::Unauthenticated("Invalid room credential".to_string()));
    }

    let (room, outcome) = update_room(state, room_id, |room| {
        let outcome = room.join(&user.id, Utc::now());
        Ok(if outcome.mutated() {
            Mutation::Save(outcome)
        } else {
            Mutation::Skip(outcome)
        })
    })
    .await?;

    match outcome {
        JoinOutcome::Pending => {
            info!("User {} requested to join room {}", user.id, room_id);
            state
                .notifier
                .publish_to_user(&room.owner_id, ServerEvent::MembersUpdated(RoomRef::new(room_id)))
                .await;
        }
        JoinOutcome::Owner => {
            info!("Owner {} entered room {}", user.id, room_id);
            state
                .notifier
                .publish(room_id, ServerEvent::MembersUpdated(RoomRef::new(room_id)))
                .await;
        }
        JoinOutcome::Existing(role) => debug!("User {} rejoined room {} as {}", user.id, room_id, role),
    }

    Ok(RoomJoinResponse {
        room_id: room.room_id,
        role: outcome.role(),
    })
}

pub async fn approve_member(
    state: &AppState,
    user: &AuthUser,
    room_id: &str,
    target: &str,
) -> Result<MemberUpdateResponse, ApiError> {
    let (room, _) = update_room(state, room_id, |room| {
        auth::ensure_room_owner(room, user)?;
        room.approve(target)?;
        Ok(Mutation::Save(()))
    })
    .await?;
    info!("User {} approved in room {}", target, room_id);

    let notice = RoomNotice::new(room_id, format!("Your request to join room {} was approved", room_id));
    state.notifier.publish_to_user(target, ServerEvent::Approved(notice)).await;
    state
        .notifier
        .publish(room_id, ServerEvent::MembersUpdated(RoomRef::new(room_id)))
        .await;

    Ok(MemberUpdateResponse {
        room_id: room.room_id,
        user_id: target.to_string(),
        role: Some(Role::Member),
        owner_id: room.owner_id,
    })
}

pub async fn reject_member(
    state: &AppState,
    user: &AuthUser,
    room_id: &str,
    target: &str,
) -> Result<MemberUpdateResponse, ApiError> {
    let (room, _) = update_room(state, room_id, |room| {
        auth::ensure_room_owner(room, user)?;
        room.reject(target)?;
        Ok(Mutation::Save(()))
    })
    .await?;
    info!("User {} rejected from room {}", target, room_id);

    let notice = RoomNotice::new(room_id, format!("Your request to join room {} was rejected", room_id));
    state.notifier.publish_to_user(target, ServerEvent::Rejected(notice)).await;
    state
        .notifier
        .publish(room_id, ServerEvent::MembersUpdated(RoomRef::new(room_id)))
        .await;

    Ok(MemberUpdateResponse {
        room_id: room.room_id,
        user_id: target.to_string(),
        role: None,
        owner_id: room.owner_id,
    })
}

pub async fn kick_member(
    state: &AppState,
    user: &AuthUser,
    room_id: &str,
    target: &str,
) -> Result<MemberUpdateResponse, ApiError> {
    let (room, removed) = update_room(state, room_id, |room| {
        auth::ensure_room_owner(room, user)?;
        Ok(Mutation::Save(room.kick(target)?))
    })
    .await?;
    info!("User {} ({}) kicked from room {}", target, removed.role, room_id);

    let notice = RoomNotice::new(room_id, format!("You were removed from room {}", room_id));
    state.notifier.publish_to_user(target, ServerEvent::Kicked(notice)).await;
    state
        .notifier
        .publish(room_id, ServerEvent::MembersUpdated(RoomRef::new(room_id)))
        .await;

    Ok(MemberUpdateResponse {
        room_id: room.room_id,
        user_id: target.to_string(),
        role: None,
        owner_id: room.owner_id,
    })
}

pub async fn change_member_role(
    state: &AppState,
    user: &AuthUser,
    room_id: &str,
    target: &str,
    role: &str,
) -> Result<MemberUpdateResponse, ApiError> {
    let new_role: Role = role.parse().map_err(ApiError::Validation)?;

    let (room, change) = update_room(state, room_id, |room| {
        auth::ensure_room_owner(room, user)?;
        let change = room.change_role(target, new_role)?;
        Ok(if change.mutated() {
            Mutation::Save(change)
        } else {
            Mutation::Skip(change)
        })
    })
    .await?;

    if change.mutated() {
        match &change.previous_owner {
            Some(previous) => info!("Ownership of room {} moved from {} to {}", room_id, previous, target),
            None => info!("User {} in room {}: {} -> {}", target, room_id, change.previous, change.current),
        }
        state
            .notifier
            .publish(room_id, ServerEvent::MembersUpdated(RoomRef::new(room_id)))
            .await;
    }

    Ok(MemberUpdateResponse {
        room_id: room.room_id,
        user_id: target.to_string(),
        role: Some(change.current),
        owner_id: room.owner_id,
    })
}

/// Remove the room outright and tell every member and subscriber exactly once
pub async fn delete_room(state: &AppState, user: &AuthUser, room_id: &str) -> Result<RoomDeleteResponse, ApiError> {
    let retries = state.config.room_save_retries;
    let mut deleted = None;
    for attempt in 0..=retries {
        let room = load_room(state, room_id).await?;
        auth::ensure_room_owner(&room, user)?;
        match state.rooms.delete_room(&room).await {
            Ok(true) => {
                deleted = Some(room);
                break;
            }
            Ok(false) => return Err(ApiError::room_not_found(room_id)),
            Err(StoreError::VersionConflict(_)) => {
                warn!("Room {} changed before delete (attempt {}/{})", room_id, attempt + 1, retries + 1);
            }
            Err(e) => return Err(e.into()),
        }
    }
    let room = deleted.ok_or_else(|| ApiError::from(StoreError::VersionConflict(room_id.to_string())))?;
    info!("Room {} deleted by {}", room_id, user.id);

    let member_ids = room.member_ids();

    let notice = RoomNotice::new(room_id, format!("Room {} was deleted by its owner", room_id));
    let delivered = state
        .notifier
        .publish_to_room_and_users(room_id, &member_ids, ServerEvent::RoomDeleted(notice))
        .await;
    state.notifier.close_room(room_id).await;
    debug!("room_deleted for {} reached {} connection(s)", room_id, delivered);

    Ok(RoomDeleteResponse {
        success: true,
        notified_members: member_ids.len(),
    })
}

pub async fn room_snapshot(state: &AppState, room_id: &str) -> Result<RoomSnapshot, ApiError> {
    let room = load_room(state, room_id).await?;
    let members = member_views(state, &room).await?;
    Ok(RoomSnapshot {
        room_id: room.room_id.clone(),
        owner_id: room.owner_id.clone(),
        metadata: room.metadata.clone(),
        created_at: room.created_at,
        members,
        files: file_views(&room),
    })
}

pub async fn list_members(state: &AppState, room_id: &str) -> Result<Vec<MemberView>, ApiError> {
    let room = load_room(state, room_id).await?;
    member_views(state, &room).await
}

pub async fn role_of(state: &AppState, user: &AuthUser, room_id: &str) -> Result<RoomRoleResponse, ApiError> {
    let room = load_room(state, room_id).await?;
    Ok(RoomRoleResponse {
        room_id: room.room_id.clone(),
        role: role_label(&room, &user.id),
    })
}

/// Rooms the user owns or holds any entry in, pending included. The role is reported exactly
/// as `role_of` does, so an owner who never joined shows up as `none`.
pub async fn list_rooms(state: &AppState, user: &AuthUser) -> Result<Vec<RoomSummary>, ApiError> {
    let rooms = state.rooms.find_rooms_for_user(&user.id).await?;
    Ok(rooms
        .into_iter()
        .map(|room| RoomSummary {
            role: role_label(&room, &user.id),
            room_id: room.room_id,
            owner_id: room.owner_id,
            created_at: room.created_at,
        })
        .collect())
}

fn role_label(room: &Room, user_id: &str) -> String {
    room.role_of(user_id)
        .map(|r| r.to_string())
        .unwrap_or_else(|| "none".to_string())
}

async fn member_views(state: &AppState, room: &Room) -> Result<Vec<MemberView>, ApiError> {
    let users = state.users.find_users_by_ids(&room.member_ids()).await?;
    let names: HashMap<String, String> = users.into_iter().map(|u| (u.id, u.username)).collect();
    Ok(room
        .members
        .iter()
        .map(|m| MemberView {
            user_id: m.user_id.clone(),
            username: names.get(&m.user_id).cloned().unwrap_or_else(|| m.user_id.clone()),
            role: m.role,
            added_at: m.added_at,
        })
        .collect())
}

pub(crate) fn file_views(room: &Room) -> Vec<FileView> {
    room.files
        .iter()
        .map(|f| FileView {
            file_id: f.file_id.clone(),
            name: f.name.clone(),
            created_at: f.created_at,
            allowed: Vec::new(),
        })
        .collect()
}
