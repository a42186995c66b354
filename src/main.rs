use std::panic;
use std::sync::Arc;

use colabri_rooms::db::{MemoryStore, PgStore, RoomStore, UserStore};
use colabri_rooms::{build_app, AppState, Config};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Set panic hook for better error messages
    panic::set_hook(Box::new(|info| {
        eprintln!("PANIC: {info}");
    }));

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            // Default to info level, but allow debug for our app
            "colabri_rooms=debug,tower_http=debug,axum::rejection=trace,info".into()
        }))
        .init();

    info!("Starting server...");

    let config = Config::load().unwrap_or_else(|e| {
        error!("Failed to load configuration: {}", e);
        warn!("Using default configuration");
        Config::default()
    });

    let (users, rooms): (Arc<dyn UserStore>, Arc<dyn RoomStore>) = match &config.db_url {
        Some(db_url) => {
            let store = Arc::new(PgStore::connect(db_url).await?);
            store.ensure_schema().await?;
            info!("Database initialized successfully");
            let users: Arc<dyn UserStore> = store.clone();
            (users, store)
        }
        None => {
            warn!("No database URL configured, rooms and users live in memory only");
            let store = Arc::new(MemoryStore::new());
            let users: Arc<dyn UserStore> = store.clone();
            (users, store)
        }
    };

    let address = config.server_address();
    let state = Arc::new(AppState::new(config, users, rooms));
    let app = build_app(state.clone());

    let listener = tokio::net::TcpListener::bind(&address).await?;
    info!("🚀 Server running on http://{}", address);
    info!("📡 WebSocket available at ws://{}/ws", address);
    info!("📚 Swagger UI available at http://{}/swagger", address);

    let hub = state.hub.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {}", e);
            }
            info!("Shutdown signal received, closing connections");
            hub.shutdown().await;
        })
        .await?;

    info!("Server stopped");
    Ok(())
}
