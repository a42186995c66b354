use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};

use crate::models::{ApiError, AuthUser, MemberRoleRequest, MemberUpdateResponse, MemberView};
use crate::services::room_service;
use crate::state::AppState;

pub async fn member_list(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<String>,
) -> Result<(StatusCode, Json<Vec<MemberView>>), ApiError> {
    let members = room_service::list_members(&state, &room_id).await?;
    Ok((StatusCode::OK, Json(members)))
}

pub async fn member_approve(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path((room_id, user_id)): Path<(String, String)>,
) -> Result<(StatusCode, Json<MemberUpdateResponse>), ApiError> {
    let updated = room_service::approve_member(&state, &user, &room_id, &user_id).await?;
    Ok((StatusCode::OK, Json(updated)))
}

pub async fn member_reject(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path((room_id, user_id)): Path<(String, String)>,
) -> Result<(StatusCode, Json<MemberUpdateResponse>), ApiError> {
    let updated = room_service::reject_member(&state, &user, &room_id, &user_id).await?;
    Ok((StatusCode::OK, Json(updated)))
}

pub async fn member_kick(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path((room_id, user_id)): Path<(String, String)>,
) -> Result<(StatusCode, Json<MemberUpdateResponse>), ApiError> {
    let updated = room_service::kick_member(&state, &user, &room_id, &user_id).await?;
    Ok((StatusCode::OK, Json(updated)))
}

/// Assign a role. Assigning `owner` transfers ownership and demotes the previous owner to member.
pub async fn member_role(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path((room_id, user_id)): Path<(String, String)>,
    Json(request): Json<MemberRoleRequest>,
) -> Result<(StatusCode, Json<MemberUpdateResponse>), ApiError> {
    let updated = room_service::change_member_role(&state, &user, &room_id, &user_id, &request.role).await?;
    Ok((StatusCode::OK, Json(updated)))
}
