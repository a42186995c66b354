use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use tracing::{debug, warn};

use crate::db::RoomField;
use crate::models::HealthResponse;
use crate::state::AppState;

/// Health check endpoint
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    debug!("Health check requested");
    Json(HealthResponse {
        status: "ok".to_string(),
        service: state.config.service_name.clone(),
        message: "Server is running".to_string(),
    })
}

/// Readiness check endpoint, answers 503 while the room store is unreachable
pub async fn ready_check(State(state): State<Arc<AppState>>) -> (StatusCode, Json<HealthResponse>) {
    debug!("Readiness check requested");
    match state.rooms.find_room_by(RoomField::RoomId("room-readiness")).await {
        Ok(_) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "ok".to_string(),
                service: state.config.service_name.clone(),
                message: "Service is ready".to_string(),
            }),
        ),
        Err(e) => {
            warn!("Readiness probe failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "unavailable".to_string(),
                    service: state.config.service_name.clone(),
                    message: "Room store is unreachable".to_string(),
                }),
            )
        }
    }
}
