use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};

use crate::models::{ApiError, AuthUser, FileCreateRequest, FileDeleteResponse, FileView};
use crate::services::file_service;
use crate::state::AppState;

pub async fn file_list(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<String>,
) -> Result<(StatusCode, Json<Vec<FileView>>), ApiError> {
    let files = file_service::list_files(&state, &room_id).await?;
    Ok((StatusCode::OK, Json(files)))
}

pub async fn file_create(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(room_id): Path<String>,
    Json(request): Json<FileCreateRequest>,
) -> Result<(StatusCode, Json<FileView>), ApiError> {
    let file = file_service::create_file(&state, &user, &room_id, &request.name).await?;
    Ok((StatusCode::CREATED, Json(file)))
}

/// Idempotent: deleting a missing file still answers 200 with `removed: false`
pub async fn file_delete(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path((room_id, file_id)): Path<(String, String)>,
) -> Result<(StatusCode, Json<FileDeleteResponse>), ApiError> {
    let deleted = file_service::delete_file(&state, &user, &room_id, &file_id).await?;
    Ok((StatusCode::OK, Json(deleted)))
}
