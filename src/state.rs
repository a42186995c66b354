use std::sync::Arc;

use tracing::warn;

use crate::auth::{Argon2Credentials, CredentialService};
use crate::config::Config;
use crate::db::{MemoryStore, RoomStore, UserStore};
use crate::services::auth_service::TokenService;
use crate::ws::{Hub, Notifier};

/// Shared application state, handed to every handler as `State<Arc<AppState>>`
pub struct AppState {
    pub config: Config,
    pub users: Arc<dyn UserStore>,
    pub rooms: Arc<dyn RoomStore>,
    pub credentials: Arc<dyn CredentialService>,
    pub tokens: TokenService,
    pub hub: Arc<Hub>,
    pub notifier: Arc<dyn Notifier>,
}

impl AppState {
    pub fn new(config: Config, users: Arc<dyn UserStore>, rooms: Arc<dyn RoomStore>) -> Self {
        let secret = match &config.auth_jwt_secret {
            Some(secret) if !secret.is_empty() => secret.clone(),
            _ => {
                warn!("AUTH_JWT_SECRET not set, using a random secret; tokens will not survive a restart");
                format!("{}{}", uuid::Uuid::new_v4().simple(), uuid::Uuid::new_v4().simple())
            }
        };
        let tokens = TokenService::new(secret, config.token_ttl_hours);
        let hub = Arc::new(Hub::new());
        Self {
            config,
            users,
            rooms,
            credentials: Arc::new(Argon2Credentials::new()),
            tokens,
            notifier: hub.clone(),
            hub,
        }
    }

    /// State backed by a fresh in-process store
    pub fn in_memory(config: Config) -> Self {
        let store = Arc::new(MemoryStore::new());
        Self::new(config, store.clone(), store)
    }
}
