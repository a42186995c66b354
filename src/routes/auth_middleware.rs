use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{debug, warn};

use crate::models::ApiError;
use crate::services::auth_service::{get_auth_token, resolve_user};
use crate::state::AppState;

/// Resolve the bearer token and put the `AuthUser` into request extensions
pub async fn auth_middleware(State(state): State<Arc<AppState>>, mut req: Request, next: Next) -> Response {
    let token = match get_auth_token(req.headers()) {
        Ok(token) => token,
        Err(e) => {
            debug!("Request without credentials: {}", e);
            return ApiError::Unauthenticated(e).into_response();
        }
    };

    let user = match resolve_user(&state, &token).await {
        Ok(user) => user,
        Err(e) => {
            warn!("Rejected token on {}: {}", req.uri().path(), e);
            return e.into_response();
        }
    };

    req.extensions_mut().insert(user);
    next.run(req).await
}
