use std::time::Duration;

use axum::http::{self, HeaderMap};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, TokenData, Validation};
use moka::sync::Cache;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::db::UserField;
use crate::models::{ApiError, AuthUser, CredentialsRequest, SessionResponse, User};
use crate::state::AppState;

const TOKEN_TYPE_USER: &str = "user";
/// Ten years
const MAX_TOKEN_TTL_HOURS: i64 = 24 * 365 * 10;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(rename = "type")]
    pub type_: String,
    /// Makes every issued token distinct, even within the same second
    pub jti: String,
    pub iat: usize,
    pub exp: usize,
}

/// Issues and validates session tokens and caches resolved identities
pub struct TokenService {
    secret: String,
    ttl: chrono::Duration,
    cache: Cache<String, AuthUser>,
}

impl TokenService {
    pub fn new(secret: String, ttl_hours: i64) -> Self {
        Self {
            secret,
            ttl: chrono::Duration::hours(ttl_hours.clamp(1, MAX_TOKEN_TTL_HOURS)),
            cache: Cache::builder()
                .max_capacity(100_000)
                .time_to_idle(Duration::from_secs(5 * 60))
                .build(),
        }
    }

    pub fn issue(&self, user_id: &str) -> Result<String, ApiError> {
        let now = Utc::now();
        let expires_at = now
            .checked_add_signed(self.ttl)
            .ok_or_else(|| ApiError::Internal("Session token expiry is out of range".to_string()))?;
        let claims = Claims {
            sub: user_id.to_string(),
            type_: TOKEN_TYPE_USER.to_string(),
            jti: uuid::Uuid::new_v4().to_string(),
            iat: now.timestamp() as usize,
            exp: expires_at.timestamp() as usize,
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(self.secret.as_bytes()))
            .map_err(|e| ApiError::Internal(format!("Failed to sign session token: {}", e)))
    }

    /// Validate a JWT token and return the token data
    pub fn validate(&self, token: &str) -> Result<TokenData<Claims>, jsonwebtoken::errors::Error> {
        let validation = Validation::new(Algorithm::HS256);
        let decoding_key = DecodingKey::from_secret(self.secret.as_bytes());
        decode::<Claims>(token, &decoding_key, &validation)
    }

    pub fn cached(&self, token: &str) -> Option<AuthUser> {
        self.cache.get(token)
    }

    fn remember(&self, token: &str, user: AuthUser) {
        self.cache.insert(token.to_string(), user);
    }

    pub fn forget(&self, token: &str) {
        self.cache.invalidate(token);
    }

    pub fn cached_count(&self) -> u64 {
        self.cache.entry_count()
    }
}

/// Get the auth token from request headers: bearer header first, then the `auth_token` cookie
pub fn get_auth_token(headers: &HeaderMap) -> Result<String, String> {
    if let Some(auth_header) = headers.get(http::header::AUTHORIZATION) {
        let auth_str = auth_header.to_str().map_err(|_| "Invalid Authorization header".to_string())?;
        Ok(auth_str.strip_prefix("Bearer ").unwrap_or(auth_str).to_string())
    } else {
        let cookie_header = headers
            .get(http::header::COOKIE)
            .ok_or_else(|| "Missing Authorization header or Cookie".to_string())?
            .to_str()
            .map_err(|_| "Invalid Cookie header".to_string())?;

        for cookie in cookie::Cookie::split_parse(cookie_header).flatten() {
            if cookie.name() == "auth_token" {
                return Ok(cookie.value().to_string());
            }
        }
        Err("auth_token cookie not found".to_string())
    }
}

fn validate_credentials(request: &CredentialsRequest) -> Result<(), ApiError> {
    if request.username.trim().is_empty() {
        return Err(ApiError::Validation("username is required".to_string()));
    }
    if request.password.is_empty() {
        return Err(ApiError::Validation("password is required".to_string()));
    }
    Ok(())
}

pub async fn sign_up(state: &AppState, request: CredentialsRequest) -> Result<SessionResponse, ApiError> {
    validate_credentials(&request)?;
    let username = request.username.trim().to_string();

    if state.users.find_user_by(UserField::Username(&username)).await?.is_some() {
        return Err(ApiError::Conflict(format!("User '{}' already exists", username)));
    }

    let password_hash = state.credentials.hash(&request.password).map_err(ApiError::Internal)?;
    let id = uuid::Uuid::new_v4().to_string();
    let token = state.tokens.issue(&id)?;
    let user = state
        .users
        .create_user(User {
            id,
            username,
            password_hash,
            token: Some(token.clone()),
            created_at: Utc::now(),
        })
        .await?;

    info!("User {} signed up as {}", user.id, user.username);
    Ok(SessionResponse {
        user_id: user.id,
        username: user.username,
        token,
    })
}

/// Verify credentials and rotate the user's session token
pub async fn sign_in(state: &AppState, request: CredentialsRequest) -> Result<SessionResponse, ApiError> {
    validate_credentials(&request)?;
    let username = request.username.trim();

    let mut user = match state.users.find_user_by(UserField::Username(username)).await? {
        Some(user) if state.credentials.verify(&request.password, &user.password_hash) => user,
        _ => {
            warn!("Failed sign-in for {}", username);
            return Err(ApiError::Unauthenticated("Invalid username or password".to_string()));
        }
    };

    let token = state.tokens.issue(&user.id)?;
    if let Some(previous) = user.token.replace(token.clone()) {
        state.tokens.forget(&previous);
    }
    state.users.save_user(&user).await?;

    info!("User {} signed in, session token rotated", user.id);
    Ok(SessionResponse {
        user_id: user.id,
        username: user.username,
        token,
    })
}

/// Resolve a bearer token to the user holding it as their current session token
pub async fn resolve_user(state: &AppState, token: &str) -> Result<AuthUser, ApiError> {
    if let Some(user) = state.tokens.cached(token) {
        return Ok(user);
    }

    let token_data = state.tokens.validate(token).map_err(|e| {
        warn!("JWT validation failed: {}", e);
        ApiError::Unauthenticated("Invalid or expired token".to_string())
    })?;
    if token_data.claims.type_ != TOKEN_TYPE_USER {
        return Err(ApiError::Unauthenticated(format!("Invalid token type: {}", token_data.claims.type_)));
    }

    let user = state
        .users
        .find_user_by(UserField::Id(&token_data.claims.sub))
        .await?
        .ok_or_else(|| ApiError::Unauthenticated("Unknown user".to_string()))?;
    if user.token.as_deref() != Some(token) {
        return Err(ApiError::Unauthenticated("Session token has been superseded".to_string()));
    }

    let auth_user = AuthUser::from(&user);
    state.tokens.remember(token, auth_user.clone());
    Ok(auth_user)
}
