use crate::models::{ApiError, AuthUser, Role, Room};

pub fn is_room_owner(room: &Room, user: &AuthUser) -> bool {
    room.is_owner(&user.id)
}

/// Owner-only operations are checked against the room's owner identity, never against the
/// requester's own membership role.
pub fn ensure_room_owner(room: &Room, user: &AuthUser) -> Result<(), ApiError> {
    if is_room_owner(room, user) {
        return Ok(());
    }
    Err(ApiError::Forbidden(format!(
        "Only the owner of room '{}' can perform this action",
        room.room_id
    )))
}

pub fn can_create_file(role: Option<Role>) -> bool {
    matches!(role, Some(r) if !r.is_pending())
}

pub fn can_delete_file(role: Option<Role>) -> bool {
    matches!(role, Some(Role::Owner) | Some(Role::Editor))
}

/// Whether a user may open a file for collaborative editing.
///
/// `allowed` comes from the client-side mirror; the server does not model per-file grants, so a
/// positive answer through `allowed` is a UI hint and not an enforced permission.
pub fn can_open_file(role: Option<Role>, user_id: &str, allowed: &[String]) -> bool {
    match role {
        Some(Role::Owner) | Some(Role::Editor) => true,
        Some(Role::Pending) | None => false,
        Some(_) => allowed.iter().any(|a| a == user_id),
    }
}

pub fn ensure_can_create_file(room: &Room, user: &AuthUser) -> Result<Role, ApiError> {
    let role = room.role_of(&user.id);
    match role {
        Some(r) if can_create_file(role) => Ok(r),
        _ => Err(ApiError::Forbidden(format!(
            "User '{}' must be an approved member of room '{}' to create files",
            user.username, room.room_id
        ))),
    }
}

pub fn ensure_can_delete_file(room: &Room, user: &AuthUser) -> Result<Role, ApiError> {
    let role = room.role_of(&user.id);
    match role {
        Some(r) if can_delete_file(role) => Ok(r),
        _ => Err(ApiError::Forbidden(format!(
            "Only owners and editors of room '{}' can delete files",
            room.room_id
        ))),
    }
}

pub fn is_admin(admins: &[String], user: &AuthUser) -> bool {
    admins.iter().any(|a| a == &user.username)
}

pub fn ensure_admin(admins: &[String], user: &AuthUser) -> Result<(), ApiError> {
    if is_admin(admins, user) {
        return Ok(());
    }
    Err(ApiError::Forbidden("Admin access required".to_string()))
}
