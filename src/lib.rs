pub mod auth;
pub mod client;
pub mod config;
pub mod db;
pub mod docs;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod utils;
pub mod ws;

use std::sync::Arc;

use axum::{
    http::{HeaderValue, Method},
    routing::get,
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub use config::Config;
pub use state::AppState;

use docs::ApiDoc;
use routes::create_api_routes;
use ws::handler::websocket_handler;

/// Assemble the HTTP API, the socket endpoint and Swagger UI
pub fn build_app(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config);

    let socket = Router::new()
        .route("/ws", get(websocket_handler))
        .with_state(state.clone());

    Router::new()
        .nest("/api", create_api_routes(state))
        .merge(socket)
        .merge(SwaggerUi::new("/swagger").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

fn cors_layer(config: &Config) -> CorsLayer {
    let methods = [Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS];
    let origins: Vec<HeaderValue> = config
        .cors_origin_list()
        .into_iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    if origins.is_empty() {
        CorsLayer::new().allow_origin(Any).allow_methods(methods).allow_headers(Any)
    } else {
        CorsLayer::new().allow_origin(origins).allow_methods(methods).allow_headers(Any)
    }
}
