//! Axum handlers of the stub debugger.

use axum::Json;
use axum::extract::State;
use axum::extract::ws::WebSocketUpgrade;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::Utc;
use serde::Serialize;

use super::connection::run_connection;
use super::state::{StatsSnapshot, StubState};

/// `GET /` and `GET /ws` — Upgrade HTTP connection to WebSocket.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<StubState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| run_connection(socket, state))
}

/// Health check response.
#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: String,
    version: &'static str,
    paused: bool,
    stats: StatsSnapshot,
}

/// `GET /health` — Stub health and counters.
pub async fn health_handler(State(state): State<StubState>) -> impl IntoResponse {
    let paused = state.cpu.lock().await.is_paused();
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy",
            timestamp: Utc::now().to_rfc3339(),
            version: env!("CARGO_PKG_VERSION"),
            paused,
            stats: state.stats.snapshot(),
        }),
    )
}
