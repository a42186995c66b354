use std::sync::{Arc, Mutex, OnceLock};

use axum::{
    extract::{Extension, State},
    http::StatusCode,
    Json,
};
use sysinfo::System;
use tracing::info;

use crate::auth::auth;
use crate::models::{ApiError, AuthUser, DiagnosticsResponse};
use crate::state::AppState;

static SYSTEM_MONITOR: OnceLock<Mutex<System>> = OnceLock::new();

/// Presence, channel and host statistics. Restricted to configured admin users.
pub async fn diagnostics(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<(StatusCode, Json<DiagnosticsResponse>), ApiError> {
    auth::ensure_admin(&state.config.admin_usernames(), &user)?;

    let stats = state.hub.stats().await;
    let n_cached_tokens = state.tokens.cached_count() as u32;

    let (cpu_usage, memory_alloc, memory_free, memory_total) = {
        let sys_lock = SYSTEM_MONITOR.get_or_init(|| Mutex::new(System::new_all()));
        match sys_lock.lock() {
            Ok(mut sys) => {
                sys.refresh_cpu();
                sys.refresh_memory();
                (
                    sys.global_cpu_info().cpu_usage(),
                    sys.used_memory(),
                    sys.free_memory(),
                    sys.total_memory(),
                )
            }
            Err(_) => (0.0, 0, 0, 0),
        }
    };

    info!(
        "Diagnostics: CPU: {:.2}%, Mem: {}/{} MB (Free: {} MB), Users: {}, Conn: {}, Channels: {}",
        cpu_usage,
        memory_alloc / 1024 / 1024,
        memory_total / 1024 / 1024,
        memory_free / 1024 / 1024,
        stats.online_users,
        stats.connections,
        stats.room_channels
    );

    Ok((
        StatusCode::OK,
        Json(DiagnosticsResponse {
            n_online_users: stats.online_users as u32,
            n_conn: stats.connections as u32,
            n_room_channels: stats.room_channels as u32,
            n_cached_tokens,
            cpu_usage,
            memory_alloc,
            memory_total,
            memory_free,
        }),
    ))
}
