use std::sync::Arc;

use axum::{
    extract::{Extension, State},
    http::StatusCode,
    Json,
};

use crate::models::{ApiError, AuthUser, CredentialsRequest, MeResponse, SessionResponse};
use crate::services::auth_service;
use crate::state::AppState;

/// Register a new account and return its first session token
pub async fn sign_up(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CredentialsRequest>,
) -> Result<(StatusCode, Json<SessionResponse>), ApiError> {
    let session = auth_service::sign_up(&state, request).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

/// Sign in, invalidating any token issued before
pub async fn sign_in(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CredentialsRequest>,
) -> Result<(StatusCode, Json<SessionResponse>), ApiError> {
    let session = auth_service::sign_in(&state, request).await?;
    Ok((StatusCode::OK, Json(session)))
}

pub async fn me(Extension(user): Extension<AuthUser>) -> Json<MeResponse> {
    Json(MeResponse {
        user_id: user.id,
        username: user.username,
    })
}
