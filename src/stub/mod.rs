//! Stub of an emulator's debugger endpoint.
//!
//! Speaks the same protocol as the real thing: it accepts WebSocket
//! connections, treats `"."`, `"P"` and `"S"` as heartbeat, pause and
//! step, and answers every text frame with a `{"cpu": {...}}` snapshot.
//! Used by the `stub-debugger` binary and by the integration tests.

pub mod connection;
pub mod cpu;
pub mod handler;
pub mod state;

use std::net::SocketAddr;

use axum::Router;
use axum::routing::get;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;

use crate::config::StubConfig;
use crate::error::MonitorError;
use handler::{health_handler, ws_handler};
pub use state::{StatsSnapshot, StubState};

/// Handle to a running stub endpoint.
///
/// Dropping the handle stops the server.
#[derive(Debug)]
pub struct StubHandle {
    addr: SocketAddr,
    state: StubState,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl StubHandle {
    /// Address the server is bound to.
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// WebSocket URL a monitor should dial.
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// Current frame and connection counters.
    #[must_use]
    pub fn stats(&self) -> StatsSnapshot {
        self.state.stats.snapshot()
    }

    /// Closes every open connection. Returns how many were signalled.
    pub fn kick_all(&self) -> usize {
        self.state.kick.send(()).unwrap_or(0)
    }

    /// Closes all connections, stops accepting, and waits for the server.
    pub async fn shutdown(mut self) {
        let _ = self.kick_all();
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for StubHandle {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Builds the stub's router.
pub fn build_router(state: StubState) -> Router {
    Router::new()
        .route("/", get(ws_handler))
        .route("/ws", get(ws_handler))
        .route("/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Binds the stub endpoint and serves it on a background task.
///
/// # Errors
///
/// Returns [`MonitorError::Io`] if the listen address cannot be bound.
pub async fn start(config: &StubConfig) -> Result<StubHandle, MonitorError> {
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    let addr = listener.local_addr()?;

    let state = StubState::new(config.batch_size);
    let app = build_router(state.clone());

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let task = tokio::spawn(async move {
        let served = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            })
            .await;
        if let Err(e) = served {
            tracing::error!(error = %e, "stub server failed");
        }
    });

    tracing::info!(%addr, "stub debugger listening");

    Ok(StubHandle {
        addr,
        state,
        shutdown_tx: Some(shutdown_tx),
        task: Some(task),
    })
}
