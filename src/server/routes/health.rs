//! Health check endpoint.

use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::server::state::AppState;
use crate::store::{DATABASE, RECORD_STORE};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub keysets: usize,
    pub persistent: bool,
    pub uptime_secs: u64,
}

/// GET /health - Liveness and record count.
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let keysets = RECORD_STORE.read().map(|store| store.len()).unwrap_or(0);

    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        keysets,
        persistent: DATABASE.is_some(),
        uptime_secs: state.uptime_secs(),
    })
}
