//! Realtime room client: socket events plus the snapshot pull that keeps a `RoomMirror` current.

pub mod mirror;
pub mod reconcile;

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use reqwest::{Client, Response};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use crate::models::{
    ClientMessage, CredentialsRequest, ErrorResponse, RoomRef, RoomSnapshot, ServerEvent, SessionResponse,
};

pub use mirror::{ChatMessage, RoomMirror};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Socket error: {0}")]
    Socket(#[from] tungstenite::Error),

    #[error("Server answered {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Mirror error: {0}")]
    Mirror(String),

    #[error("{0}")]
    Forbidden(String),
}

/// Authenticated HTTP side of the client
#[derive(Debug, Clone)]
pub struct RoomSyncClient {
    http: Client,
    base_url: String,
    token: String,
}

impl RoomSyncClient {
    pub fn new(base_url: &str, token: &str) -> Result<Self, ClientError> {
        let http = Client::builder().timeout(Duration::from_secs(10)).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    /// Sign in and build a client holding the fresh session token
    pub async fn sign_in(base_url: &str, username: &str, password: &str) -> Result<Self, ClientError> {
        let mut client = Self::new(base_url, "")?;
        let response = client
            .http
            .post(format!("{}/api/v1/auth/signin", client.base_url))
            .json(&CredentialsRequest {
                username: username.to_string(),
                password: password.to_string(),
            })
            .send()
            .await?;
        let session: SessionResponse = read_json(response).await?;
        client.token = session.token;
        Ok(client)
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub async fn fetch_snapshot(&self, room_id: &str) -> Result<RoomSnapshot, ClientError> {
        let response = self
            .http
            .get(format!("{}/api/v1/rooms/{}", self.base_url, room_id))
            .bearer_auth(&self.token)
            .send()
            .await?;
        read_json(response).await
    }

    /// Pull the authoritative snapshot into the mirror. Returns whether the mirror changed.
    pub async fn refresh(&self, mirror: &mut RoomMirror) -> Result<bool, ClientError> {
        let snapshot = self.fetch_snapshot(mirror.room_id()).await?;
        let changed = mirror.apply_snapshot(&snapshot)?;
        debug!("Refreshed mirror of {} (changed: {})", mirror.room_id(), changed);
        Ok(changed)
    }

    pub async fn connect(&self) -> Result<RoomEvents, ClientError> {
        let ws_base = if let Some(rest) = self.base_url.strip_prefix("https://") {
            format!("wss://{}", rest)
        } else if let Some(rest) = self.base_url.strip_prefix("http://") {
            format!("ws://{}", rest)
        } else {
            self.base_url.clone()
        };
        let (stream, _) = connect_async(format!("{}/ws?token={}", ws_base, self.token)).await?;
        info!("Socket connected to {}", ws_base);
        Ok(RoomEvents { stream })
    }

    /// Follow events for the mirror's room until the socket closes or the room is lost.
    ///
    /// Missed events are covered by pulling once up front.
    pub async fn run(&self, events: &mut RoomEvents, mirror: &mut RoomMirror) -> Result<(), ClientError> {
        events.subscribe(mirror.room_id()).await?;
        self.refresh(mirror).await?;

        while let Some(event) = events.next_event().await? {
            if event.room_id() != Some(mirror.room_id()) {
                continue;
            }
            match event {
                ServerEvent::Kicked(_) | ServerEvent::RoomDeleted(_) => {
                    warn!("Lost access to room {}: {}", mirror.room_id(), event.name());
                    mirror.leave()?;
                    return Ok(());
                }
                ref e if e.needs_refresh() => {
                    self.refresh(mirror).await?;
                }
                _ => {}
            }
        }
        Ok(())
    }
}

/// Server event stream of one socket
pub struct RoomEvents {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl RoomEvents {
    async fn send(&mut self, message: &ClientMessage) -> Result<(), ClientError> {
        let text = serde_json::to_string(message)?;
        self.stream.send(Message::text(text)).await?;
        Ok(())
    }

    pub async fn subscribe(&mut self, room_id: &str) -> Result<(), ClientError> {
        self.send(&ClientMessage::SubscribeRoom(RoomRef::new(room_id))).await
    }

    pub async fn unsubscribe(&mut self, room_id: &str) -> Result<(), ClientError> {
        self.send(&ClientMessage::UnsubscribeRoom(RoomRef::new(room_id))).await
    }

    /// Next server event, or None once the socket is closed
    pub async fn next_event(&mut self) -> Result<Option<ServerEvent>, ClientError> {
        while let Some(message) = self.stream.next().await {
            match message? {
                Message::Text(text) => match serde_json::from_str(text.as_str()) {
                    Ok(event) => return Ok(Some(event)),
                    Err(e) => warn!("Ignoring unknown server event: {}", e),
                },
                Message::Close(_) => return Ok(None),
                _ => continue,
            }
        }
        Ok(None)
    }

    pub async fn close(mut self) -> Result<(), ClientError> {
        self.stream.close(None).await?;
        Ok(())
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }
    let message = match response.json::<ErrorResponse>().await {
        Ok(body) => body.error,
        Err(_) => status.to_string(),
    };
    Err(ClientError::Status {
        status: status.as_u16(),
        message,
    })
}
