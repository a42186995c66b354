use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};

use crate::models::{
    ApiError, AuthUser, RoomCreateRequest, RoomCreateResponse, RoomDeleteResponse, RoomJoinRequest, RoomJoinResponse,
    RoomRoleResponse, RoomSnapshot, RoomSummary,
};
use crate::services::room_service;
use crate::state::AppState;

/// Create a room owned by the caller. The plaintext credential is only ever returned here.
pub async fn room_create(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<RoomCreateRequest>,
) -> Result<(StatusCode, Json<RoomCreateResponse>), ApiError> {
    let created = room_service::create_room(&state, &user, request.metadata).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn room_list(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<(StatusCode, Json<Vec<RoomSummary>>), ApiError> {
    let rooms = room_service::list_rooms(&state, &user).await?;
    Ok((StatusCode::OK, Json(rooms)))
}

pub async fn room_get(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<String>,
) -> Result<(StatusCode, Json<RoomSnapshot>), ApiError> {
    let snapshot = room_service::room_snapshot(&state, &room_id).await?;
    Ok((StatusCode::OK, Json(snapshot)))
}

/// Force delete a room. Owner only.
pub async fn room_delete(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(room_id): Path<String>,
) -> Result<(StatusCode, Json<RoomDeleteResponse>), ApiError> {
    let deleted = room_service::delete_room(&state, &user, &room_id).await?;
    Ok((StatusCode::OK, Json(deleted)))
}

pub async fn room_join(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(room_id): Path<String>,
    Json(request): Json<RoomJoinRequest>,
) -> Result<(StatusCode, Json<RoomJoinResponse>), ApiError> {
    let joined = room_service::join_room(&state, &user, &room_id, &request.password).await?;
    Ok((StatusCode::OK, Json(joined)))
}

pub async fn room_role(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(room_id): Path<String>,
) -> Result<(StatusCode, Json<RoomRoleResponse>), ApiError> {
    let role = room_service::role_of(&state, &user, &room_id).await?;
    Ok((StatusCode::OK, Json(role)))
}
