use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;
use utoipa::ToSchema;

use crate::db::StoreError;
use crate::models::TransitionError;

/// Response for an error
#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct ErrorResponse {
    pub code: u16,
    pub status: String,
    pub error: String,
}

/// Failure returned to API callers
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unauthenticated(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    /// The target exists but is not in the state the operation expects
    #[error("{0}")]
    InvalidState(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::InvalidState(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn room_not_found(room_id: &str) -> Self {
        ApiError::NotFound(format!("Room '{}' not found", room_id))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::Internal(detail) => {
                error!("Internal error: {}", detail);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        (
            status,
            Json(ErrorResponse {
                code: status.as_u16(),
                status: status.to_string(),
                error: message,
            }),
        )
            .into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Duplicate(what) => ApiError::Conflict(format!("{} already exists", what)),
            StoreError::NotFound(what) => ApiError::NotFound(format!("{} not found", what)),
            StoreError::VersionConflict(room_id) => {
                ApiError::Conflict(format!("Room '{}' was modified concurrently, retry the request", room_id))
            }
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<TransitionError> for ApiError {
    fn from(e: TransitionError) -> Self {
        match e {
            TransitionError::NoEntry(_) => ApiError::NotFound(e.to_string()),
            TransitionError::UnassignableRole(_) => ApiError::Validation(e.to_string()),
            TransitionError::UnexpectedRole { .. } | TransitionError::OwnerNotKickable | TransitionError::OwnerRoleFixed => {
                ApiError::InvalidState(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_maps_to_stable_statuses() {
        assert_eq!(ApiError::Validation("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::Unauthenticated("x".into()).status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::Forbidden("x".into()).status(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::from(TransitionError::NoEntry("u".into())).status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::from(TransitionError::OwnerNotKickable).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::from(StoreError::Duplicate("User 'a'".into())).status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn internal_errors_do_not_leak_detail() {
        let response = ApiError::Internal("connection refused at 10.0.0.3".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let parsed: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed.error, "Internal server error");
        assert_eq!(parsed.code, 500);
    }
}
