use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::models::*;

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    )
)]
#[allow(dead_code)]
pub async fn health_check_doc() {}

/// Readiness check endpoint
#[utoipa::path(
    get,
    path = "/api/ready",
    responses(
        (status = 200, description = "Service is ready", body = HealthResponse),
        (status = 503, description = "Room store is unreachable", body = HealthResponse)
    )
)]
#[allow(dead_code)]
pub async fn ready_check_doc() {}

/// Register a new account
#[utoipa::path(
    post,
    path = "/api/v1/auth/signup",
    request_body = CredentialsRequest,
    responses(
        (status = 201, description = "Account created", body = SessionResponse),
        (status = 400, description = "Missing username or password", body = ErrorResponse),
        (status = 409, description = "Username already taken", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn sign_up_doc() {}

/// Sign in and rotate the session token
#[utoipa::path(
    post,
    path = "/api/v1/auth/signin",
    request_body = CredentialsRequest,
    responses(
        (status = 200, description = "Signed in, previous token invalidated", body = SessionResponse),
        (status = 401, description = "Invalid username or password", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn sign_in_doc() {}

/// The authenticated user
#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    responses(
        (status = 200, description = "The authenticated user", body = MeResponse),
        (status = 401, description = "Missing or superseded token", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
#[allow(dead_code)]
pub async fn me_doc() {}

/// Create a room
#[utoipa::path(
    post,
    path = "/api/v1/rooms",
    request_body = RoomCreateRequest,
    responses(
        (status = 201, description = "Room created, credential returned once", body = RoomCreateResponse)
    ),
    security(("bearer" = []))
)]
#[allow(dead_code)]
pub async fn room_create_doc() {}

/// List the caller's rooms
#[utoipa::path(
    get,
    path = "/api/v1/rooms",
    responses(
        (status = 200, description = "Rooms the caller holds an entry in", body = [RoomSummary])
    ),
    security(("bearer" = []))
)]
#[allow(dead_code)]
pub async fn room_list_doc() {}

/// Get a room snapshot
#[utoipa::path(
    get,
    path = "/api/v1/rooms/{room_id}",
    params(
        ("room_id" = String, Path, description = "Room id")
    ),
    responses(
        (status = 200, description = "Room snapshot", body = RoomSnapshot),
        (status = 404, description = "Room not found", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
#[allow(dead_code)]
pub async fn room_get_doc() {}

/// Force delete a room
#[utoipa::path(
    delete,
    path = "/api/v1/rooms/{room_id}",
    params(
        ("room_id" = String, Path, description = "Room id")
    ),
    responses(
        (status = 200, description = "Room deleted", body = RoomDeleteResponse),
        (status = 403, description = "Caller is not the owner", body = ErrorResponse),
        (status = 404, description = "Room not found", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
#[allow(dead_code)]
pub async fn room_delete_doc() {}

/// Join a room with its credential
#[utoipa::path(
    post,
    path = "/api/v1/rooms/{room_id}/join",
    params(
        ("room_id" = String, Path, description = "Room id")
    ),
    request_body = RoomJoinRequest,
    responses(
        (status = 200, description = "Joined, or join request pending", body = RoomJoinResponse),
        (status = 401, description = "Invalid room credential", body = ErrorResponse),
        (status = 404, description = "Room not found", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
#[allow(dead_code)]
pub async fn room_join_doc() {}

/// Get the caller's role in a room
#[utoipa::path(
    get,
    path = "/api/v1/rooms/{room_id}/role",
    params(
        ("room_id" = String, Path, description = "Room id")
    ),
    responses(
        (status = 200, description = "The caller's role, or none", body = RoomRoleResponse),
        (status = 404, description = "Room not found", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
#[allow(dead_code)]
pub async fn room_role_doc() {}

/// List room members
#[utoipa::path(
    get,
    path = "/api/v1/rooms/{room_id}/members",
    params(
        ("room_id" = String, Path, description = "Room id")
    ),
    responses(
        (status = 200, description = "Members with usernames", body = [MemberView]),
        (status = 404, description = "Room not found", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
#[allow(dead_code)]
pub async fn member_list_doc() {}

/// Approve a pending join request
#[utoipa::path(
    post,
    path = "/api/v1/rooms/{room_id}/members/{user_id}/approve",
    params(
        ("room_id" = String, Path, description = "Room id"),
        ("user_id" = String, Path, description = "Target user id")
    ),
    responses(
        (status = 200, description = "Member approved", body = MemberUpdateResponse),
        (status = 400, description = "User is not pending", body = ErrorResponse),
        (status = 403, description = "Caller is not the owner", body = ErrorResponse),
        (status = 404, description = "Room or entry not found", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
#[allow(dead_code)]
pub async fn member_approve_doc() {}

/// Reject a pending join request
#[utoipa::path(
    post,
    path = "/api/v1/rooms/{room_id}/members/{user_id}/reject",
    params(
        ("room_id" = String, Path, description = "Room id"),
        ("user_id" = String, Path, description = "Target user id")
    ),
    responses(
        (status = 200, description = "Join request rejected", body = MemberUpdateResponse),
        (status = 400, description = "User is not pending", body = ErrorResponse),
        (status = 403, description = "Caller is not the owner", body = ErrorResponse),
        (status = 404, description = "Room or entry not found", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
#[allow(dead_code)]
pub async fn member_reject_doc() {}

/// Kick a member
#[utoipa::path(
    delete,
    path = "/api/v1/rooms/{room_id}/members/{user_id}",
    params(
        ("room_id" = String, Path, description = "Room id"),
        ("user_id" = String, Path, description = "Target user id")
    ),
    responses(
        (status = 200, description = "Member removed", body = MemberUpdateResponse),
        (status = 400, description = "Owner or pending entries cannot be kicked", body = ErrorResponse),
        (status = 403, description = "Caller is not the owner", body = ErrorResponse),
        (status = 404, description = "Room or entry not found", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
#[allow(dead_code)]
pub async fn member_kick_doc() {}

/// Change a member's role
#[utoipa::path(
    put,
    path = "/api/v1/rooms/{room_id}/members/{user_id}/role",
    params(
        ("room_id" = String, Path, description = "Room id"),
        ("user_id" = String, Path, description = "Target user id")
    ),
    request_body = MemberRoleRequest,
    responses(
        (status = 200, description = "Role changed", body = MemberUpdateResponse),
        (status = 400, description = "Invalid role or transition", body = ErrorResponse),
        (status = 403, description = "Caller is not the owner", body = ErrorResponse),
        (status = 404, description = "Room or entry not found", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
#[allow(dead_code)]
pub async fn member_role_doc() {}

/// List room files
#[utoipa::path(
    get,
    path = "/api/v1/rooms/{room_id}/files",
    params(
        ("room_id" = String, Path, description = "Room id")
    ),
    responses(
        (status = 200, description = "Files of the room", body = [FileView]),
        (status = 404, description = "Room not found", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
#[allow(dead_code)]
pub async fn file_list_doc() {}

/// Create a file
#[utoipa::path(
    post,
    path = "/api/v1/rooms/{room_id}/files",
    params(
        ("room_id" = String, Path, description = "Room id")
    ),
    request_body = FileCreateRequest,
    responses(
        (status = 201, description = "File created", body = FileView),
        (status = 403, description = "Caller is not an approved member", body = ErrorResponse),
        (status = 404, description = "Room not found", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
#[allow(dead_code)]
pub async fn file_create_doc() {}

/// Delete a file
#[utoipa::path(
    delete,
    path = "/api/v1/rooms/{room_id}/files/{file_id}",
    params(
        ("room_id" = String, Path, description = "Room id"),
        ("file_id" = String, Path, description = "File id")
    ),
    responses(
        (status = 200, description = "File deleted or already absent", body = FileDeleteResponse),
        (status = 403, description = "Caller is neither owner nor editor", body = ErrorResponse),
        (status = 404, description = "Room not found", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
#[allow(dead_code)]
pub async fn file_delete_doc() {}

/// Service diagnostics
#[utoipa::path(
    get,
    path = "/api/v1/diagnostics",
    responses(
        (status = 200, description = "Service diagnostics", body = DiagnosticsResponse),
        (status = 403, description = "Admin access required", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
#[allow(dead_code)]
pub async fn diagnostics_doc() {}

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).bearer_format("JWT").build()),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check_doc,
        ready_check_doc,
        sign_up_doc,
        sign_in_doc,
        me_doc,
        room_create_doc,
        room_list_doc,
        room_get_doc,
        room_delete_doc,
        room_join_doc,
        room_role_doc,
        member_list_doc,
        member_approve_doc,
        member_reject_doc,
        member_kick_doc,
        member_role_doc,
        file_list_doc,
        file_create_doc,
        file_delete_doc,
        diagnostics_doc
    ),
    components(
        schemas(
            HealthResponse,
            ErrorResponse,
            CredentialsRequest,
            SessionResponse,
            MeResponse,
            Role,
            RoomCreateRequest,
            RoomCreateResponse,
            RoomJoinRequest,
            RoomJoinResponse,
            RoomRoleResponse,
            RoomSnapshot,
            RoomSummary,
            MemberView,
            FileView,
            MemberRoleRequest,
            MemberUpdateResponse,
            FileCreateRequest,
            FileDeleteResponse,
            RoomDeleteResponse,
            DiagnosticsResponse
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "api", description = "Room membership and file API")
    )
)]
pub struct ApiDoc;
