use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use futures_util::{SinkExt, StreamExt};
use tracing::{debug, error, info, warn};

use super::presence::ConnId;
use crate::models::{ApiError, AuthUser, ClientMessage, ServerEvent};
use crate::services::auth_service::{get_auth_token, resolve_user};
use crate::state::AppState;
use crate::utils::scope_guard::ScopeGuard;

/// Authenticate, then upgrade. The token is read from the `token` query parameter, the
/// Authorization header or the `auth_token` cookie, in that order.
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    let token = match params.get("token") {
        Some(token) if !token.is_empty() => token.clone(),
        _ => match get_auth_token(&headers) {
            Ok(token) => token,
            Err(e) => {
                warn!("Rejected socket without credentials: {}", e);
                return ApiError::Unauthenticated(e).into_response();
            }
        },
    };

    let user = match resolve_user(&state, &token).await {
        Ok(user) => user,
        Err(e) => {
            warn!("Rejected socket with invalid token: {}", e);
            return e.into_response();
        }
    };

    info!("WebSocket connection attempt by user {}", user.id);
    ws.on_upgrade(move |socket| handle_socket(socket, user, state))
}

async fn handle_socket(socket: WebSocket, user: AuthUser, state: Arc<AppState>) {
    let Some((conn_id, mut rx)) = state.hub.connect(&user.id).await else {
        warn!("Hub is closed, dropping socket of user {}", user.id);
        return;
    };

    // Presence must be released however the socket ends
    let hub = state.hub.clone();
    let _cleanup = ScopeGuard::new(move || {
        tokio::spawn(async move { hub.disconnect(conn_id).await });
    });

    info!("WebSocket connection {} established for user {}", conn_id, user.id);
    let (mut sender, mut receiver) = socket.split();

    let mut send_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(e) => {
                    error!("Failed to serialize {} for connection {}: {}", event.name(), conn_id, e);
                    continue;
                }
            };
            if sender.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
        let _ = sender.send(Message::Close(None)).await;
    });

    let recv_state = state.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => handle_client_message(&recv_state, conn_id, &text).await,
                Message::Close(_) => break,
                _ => continue,
            }
        }
    });

    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    };
    info!("WebSocket connection {} of user {} terminated", conn_id, user.id);
}

async fn handle_client_message(state: &AppState, conn_id: ConnId, text: &str) {
    let msg: ClientMessage = match serde_json::from_str(text) {
        Ok(msg) => msg,
        Err(e) => {
            debug!("Ignoring malformed message on connection {}: {}", conn_id, e);
            return;
        }
    };

    match msg {
        ClientMessage::SubscribeRoom(room) => {
            state.hub.subscribe(conn_id, &room.room_id).await;
            debug!("Connection {} subscribed to {}", conn_id, room.room_id);
            state.hub.send_to_connection(conn_id, ServerEvent::Subscribed(room)).await;
        }
        ClientMessage::UnsubscribeRoom(room) => {
            state.hub.unsubscribe(conn_id, &room.room_id).await;
            debug!("Connection {} unsubscribed from {}", conn_id, room.room_id);
            state.hub.send_to_connection(conn_id, ServerEvent::Unsubscribed(room)).await;
        }
    }
}
