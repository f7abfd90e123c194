//! HTTP server module for API and WebSocket endpoints.
//!
//! Serves the keyset records and their statistics over REST, and pushes
//! fresh statistics to WebSocket clients whenever the records or settings
//! change.

pub mod routes;
pub mod state;
pub mod ws;

use crate::server::routes::{config, health, keysets, statistics};
use crate::server::state::AppState;
use crate::server::ws::ws_handler;

use axum::{
    routing::{get, put},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::broadcast;
use tower_http::cors::{Any, CorsLayer};

/// Default server port.
pub const DEFAULT_PORT: u16 = 13235;

/// Builds the router with every route and the CORS layer.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health_check))
        // Records
        .route(
            "/api/keysets",
            get(keysets::get_keysets).post(keysets::import_keysets),
        )
        .route(
            "/api/keysets/:id",
            put(keysets::put_keyset).delete(keysets::delete_keyset),
        )
        // Statistics
        .route("/api/statistics", get(statistics::get_statistics))
        .route(
            "/api/statistics/:view",
            get(statistics::get_statistics_view),
        )
        // Config
        .route("/api/config", get(config::get_config).post(config::set_config))
        // WebSocket
        .route("/ws", get(ws_handler))
        .layer(cors)
        .with_state(state)
}

/// Starts the HTTP server on a background thread.
///
/// Returns a handle to the broadcast sender for pushing updates.
pub fn start_server(port: u16) -> std::io::Result<broadcast::Sender<String>> {
    let (tx, _) = broadcast::channel::<String>(100);
    let tx_clone = tx.clone();
    let rt = tokio::runtime::Runtime::new()?;

    std::thread::spawn(move || {
        rt.block_on(async {
            if let Err(e) = run_server(tx_clone, port).await {
                tracing::error!(%e, port, "HTTP server stopped");
            }
        });
    });

    tracing::info!(port, "HTTP server starting");
    Ok(tx)
}

/// Runs the axum server.
async fn run_server(broadcast_tx: broadcast::Sender<String>, port: u16) -> std::io::Result<()> {
    let state = Arc::new(AppState::new(broadcast_tx));
    let app = router(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("HTTP server listening on http://{}", addr);

    axum::serve(listener, app).await
}
