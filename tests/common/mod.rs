#![allow(dead_code)]

use std::sync::Arc;

use colabri_rooms::models::{AuthUser, CredentialsRequest, ServerEvent};
use colabri_rooms::services::auth_service;
use colabri_rooms::{AppState, Config};
use tokio::sync::mpsc::UnboundedReceiver;

pub fn test_config() -> Config {
    Config {
        auth_jwt_secret: Some("integration-test-secret".to_string()),
        admin_users: Some("admin".to_string()),
        ..Config::default()
    }
}

pub fn test_state() -> Arc<AppState> {
    Arc::new(AppState::in_memory(test_config()))
}

pub fn credentials(username: &str) -> CredentialsRequest {
    CredentialsRequest {
        username: username.to_string(),
        password: format!("{}-password", username),
    }
}

/// Sign a user up and return the identity plus its session token
pub async fn sign_up(state: &AppState, username: &str) -> (AuthUser, String) {
    let session = auth_service::sign_up(state, credentials(username)).await.unwrap();
    let user = AuthUser {
        id: session.user_id,
        username: session.username,
    };
    (user, session.token)
}

pub fn drain(rx: &mut UnboundedReceiver<ServerEvent>) -> Vec<ServerEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

pub fn names(events: &[ServerEvent]) -> Vec<&'static str> {
    events.iter().map(|e| e.name()).collect()
}

/// Register a live connection for the user and discard the `connected` greeting
pub async fn connect(state: &AppState, user: &AuthUser) -> (u64, UnboundedReceiver<ServerEvent>) {
    let (conn_id, mut rx) = state.hub.connect(&user.id).await.unwrap();
    drain(&mut rx);
    (conn_id, rx)
}
