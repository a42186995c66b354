use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};

use crate::handlers::*;
use crate::routes::auth_middleware::auth_middleware;
use crate::state::AppState;

/// Create API routes
pub fn create_api_routes(state: Arc<AppState>) -> Router {
    let protected = Router::<Arc<AppState>>::new()
        .route("/v1/auth/me", get(me))
        .route("/v1/rooms", post(room_create).get(room_list))
        .route("/v1/rooms/:room_id", get(room_get).delete(room_delete))
        .route("/v1/rooms/:room_id/join", post(room_join))
        .route("/v1/rooms/:room_id/role", get(room_role))
        .route("/v1/rooms/:room_id/members", get(member_list))
        .route("/v1/rooms/:room_id/members/:user_id", delete(member_kick))
        .route("/v1/rooms/:room_id/members/:user_id/approve", post(member_approve))
        .route("/v1/rooms/:room_id/members/:user_id/reject", post(member_reject))
        .route("/v1/rooms/:room_id/members/:user_id/role", put(member_role))
        .route("/v1/rooms/:room_id/files", get(file_list).post(file_create))
        .route("/v1/rooms/:room_id/files/:file_id", delete(file_delete))
        .route("/v1/diagnostics", get(diagnostics))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware)); // Applies to all routes added above

    Router::<Arc<AppState>>::new()
        .route("/health", get(health_check))
        .route("/ready", get(ready_check))
        .route("/v1/auth/signup", post(sign_up))
        .route("/v1/auth/signin", post(sign_in))
        .merge(protected)
        .with_state(state)
}
