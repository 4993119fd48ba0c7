//! Per-connection loop of the stub debugger.
//!
//! Every inbound data frame is answered with the current CPU frame,
//! whether or not it was a known command. Replies use the opcode of the
//! frame they answer.

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast;

use super::state::StubState;
use crate::domain::Command;

/// Runs the read/write loop for a single WebSocket connection.
pub async fn run_connection(socket: WebSocket, state: StubState) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let mut kick_rx = state.kick.subscribe();
    state.stats.connection_opened();

    loop {
        tokio::select! {
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let reply = handle_frame(text.as_str(), &state).await;
                        if ws_tx.send(Message::text(reply)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Binary(bytes))) => {
                        let reply = handle_frame(&String::from_utf8_lossy(&bytes), &state).await;
                        if ws_tx.send(Message::Binary(reply.into_bytes().into())).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_)) | Err(_)) | None => break,
                    _ => {}
                }
            }
            kicked = kick_rx.recv() => {
                if !matches!(kicked, Err(broadcast::error::RecvError::Closed)) {
                    let _ = ws_tx.send(Message::Close(None)).await;
                }
                break;
            }
        }
    }

    state.stats.connection_closed();
    tracing::debug!("stub connection closed");
}

/// Applies a frame to the CPU and returns the JSON reply.
async fn handle_frame(text: &str, state: &StubState) -> String {
    let command = Command::from_frame(text);
    state.stats.frame_received(command);

    let mut cpu = state.cpu.lock().await;
    match command {
        Some(cmd) => {
            cpu.apply(cmd, state.batch_size);
            if cmd != Command::Heartbeat {
                tracing::info!(
                    command = %cmd,
                    paused = cpu.is_paused(),
                    pc = cpu.pc(),
                    executed = cpu.executed(),
                    "command applied",
                );
            }
        }
        None => tracing::debug!(frame = %text, "unknown frame"),
    }

    serde_json::to_string_pretty(&cpu.frame()).unwrap_or_default()
}
