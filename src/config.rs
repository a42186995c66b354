use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info};

/// Application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Environment (dev, staging, prod)
    #[serde(default = "default_environment")]
    pub environment: String,

    /// CORS allowed origins, comma separated
    pub cors_origins: Option<String>,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Secret used to sign session tokens
    pub auth_jwt_secret: Option<String>,

    /// Session token lifetime
    #[serde(default = "default_token_ttl_hours")]
    pub token_ttl_hours: i64,

    /// Database URL. The in-memory store is used when absent.
    pub db_url: Option<String>,

    /// How often a room mutation is re-run after losing a concurrent save
    #[serde(default = "default_room_save_retries")]
    pub room_save_retries: u32,

    /// Usernames allowed to read diagnostics, comma separated
    pub admin_users: Option<String>,
}

impl Config {
    /// Load configuration from environment variables or app.env file
    pub fn load() -> Result<Self, ConfigError> {
        // Try to load from app.env file first
        if std::path::Path::new("app.env").exists() {
            dotenvy::from_filename("app.env").ok();
        } else {
            // Fallback to .env file
            dotenvy::dotenv().ok();
        }

        match envy::from_env::<Config>() {
            Ok(config) => {
                info!("✅ Configuration loaded successfully");
                Ok(config)
            }
            Err(e) => {
                error!("❌ Failed to load configuration: {}", e);
                Err(ConfigError::EnvError(e))
            }
        }
    }

    /// Get the full server address
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check if running in development mode
    pub fn is_development(&self) -> bool {
        self.environment.to_lowercase() == "dev" || self.environment.to_lowercase() == "development"
    }

    pub fn admin_usernames(&self) -> Vec<String> {
        split_list(self.admin_users.as_deref())
    }

    pub fn cors_origin_list(&self) -> Vec<String> {
        split_list(self.cors_origins.as_deref())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            environment: default_environment(),
            log_level: default_log_level(),
            cors_origins: None,
            service_name: default_service_name(),
            auth_jwt_secret: None,
            token_ttl_hours: default_token_ttl_hours(),
            db_url: None,
            room_save_retries: default_room_save_retries(),
            admin_users: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Environment variable error: {0}")]
    EnvError(#[from] envy::Error),
}

fn split_list(raw: Option<&str>) -> Vec<String> {
    raw.map(|s| {
        s.split(',')
            .map(|part| part.trim().to_string())
            .filter(|part| !part.is_empty())
            .collect()
    })
    .unwrap_or_default()
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_service_name() -> String {
    "colabri-rooms".to_string()
}

fn default_environment() -> String {
    "development".to_string()
}

fn default_token_ttl_hours() -> i64 {
    24 * 30
}

fn default_room_save_retries() -> u32 {
    5
}
