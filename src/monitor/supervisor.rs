//! Session loop behind a [`super::Monitor`] handle.
//!
//! One task owns the socket, the auto-reconnect flag, and the heartbeat
//! timer. UI actions arrive as [`Control`] messages, so every state
//! change happens here, one at a time. The heartbeat interval lives inside
//! the session future and is dropped with it: it can never tick against a
//! closed or replaced socket.

use std::time::Duration;

use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

use super::reconnect::Backoff;
use super::session::{on_binary_frame, on_frame};
use crate::config::MonitorConfig;
use crate::domain::{Command, ConnectionState, EventBus, MonitorEvent, MonitorView, SessionId};
use crate::error::MonitorError;

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// UI action forwarded to the session task.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Control {
    Connect,
    Disconnect,
    Send(Command),
}

/// What the loop does next.
enum Flow {
    Connect,
    Idle,
    Stop,
}

/// How one connection attempt ended.
enum Attempt {
    /// The handshake failed or was abandoned.
    Failed,
    /// The socket opened and has since ended.
    Opened,
    /// A manual connect asked for a fresh socket.
    Replaced,
    Stopped,
}

/// How an open session ended.
enum SessionEnd {
    Closed,
    Failed(MonitorError),
    Replaced,
    Stopped,
}

/// Write side of the view: watch channel plus event bus.
struct Outputs {
    view_tx: watch::Sender<MonitorView>,
    events: EventBus,
}

impl Outputs {
    fn update(&self, modify: impl FnOnce(&mut MonitorView)) {
        self.view_tx.send_modify(modify);
    }

    fn publish(&self, event: MonitorEvent) {
        let _ = self.events.publish(event);
    }

    fn apply_frame<F>(&self, session_id: SessionId, apply: F)
    where
        F: FnOnce(&mut MonitorView) -> Result<(), MonitorError>,
    {
        let mut outcome = Ok(());
        self.view_tx.send_if_modified(|view| {
            outcome = apply(view);
            outcome.is_ok()
        });

        match outcome {
            Ok(()) => self.publish(MonitorEvent::Snapshot {
                session_id,
                timestamp: Utc::now(),
            }),
            Err(e) => {
                tracing::warn!(%session_id, kind = e.kind_str(), error = %e, "discarding malformed frame");
                self.publish(MonitorEvent::MalformedFrame {
                    session_id,
                    message: e.to_string(),
                    timestamp: Utc::now(),
                });
            }
        }
    }
}

pub(crate) struct Supervisor {
    endpoint: String,
    heartbeat_interval: Duration,
    auto_reconnect: bool,
    backoff: Backoff,
    outputs: Outputs,
    control_rx: mpsc::UnboundedReceiver<Control>,
    cancel: CancellationToken,
}

impl Supervisor {
    pub(crate) fn new(
        config: &MonitorConfig,
        view_tx: watch::Sender<MonitorView>,
        events: EventBus,
        control_rx: mpsc::UnboundedReceiver<Control>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            endpoint: config.endpoint.clone(),
            heartbeat_interval: config.heartbeat_interval,
            auto_reconnect: config.auto_connect,
            backoff: Backoff::new(config.reconnect),
            outputs: Outputs { view_tx, events },
            control_rx,
            cancel,
        }
    }

    /// Runs until the monitor is shut down or its handle dropped.
    pub(crate) async fn run(mut self) {
        let mut flow = if self.auto_reconnect {
            Flow::Connect
        } else {
            Flow::Idle
        };

        loop {
            flow = match flow {
                Flow::Stop => break,
                Flow::Idle => self.idle().await,
                Flow::Connect => match self.attempt().await {
                    Attempt::Stopped => Flow::Stop,
                    Attempt::Replaced => Flow::Connect,
                    Attempt::Opened | Attempt::Failed if !self.auto_reconnect => Flow::Idle,
                    Attempt::Opened => {
                        let delay = self.backoff.after_session();
                        self.wait_before_retry(delay).await
                    }
                    Attempt::Failed => {
                        let delay = self.backoff.after_failure();
                        self.wait_before_retry(delay).await
                    }
                },
            };
        }

        self.outputs.update(|view| {
            view.state = view.state.closed();
            view.clear_snapshot();
        });
        tracing::debug!(endpoint = %self.endpoint, "monitor stopped");
    }

    /// Waits for a manual connect while no socket is open.
    async fn idle(&mut self) -> Flow {
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => return Flow::Stop,
                ctrl = self.control_rx.recv() => match ctrl {
                    None => return Flow::Stop,
                    Some(Control::Connect) => {
                        self.auto_reconnect = true;
                        return Flow::Connect;
                    }
                    Some(Control::Disconnect) => self.auto_reconnect = false,
                    Some(Control::Send(cmd)) => {
                        tracing::debug!(command = %cmd, "not connected, command dropped");
                    }
                },
            }
        }
    }

    async fn wait_before_retry(&mut self, delay: Duration) -> Flow {
        if delay.is_zero() {
            return Flow::Connect;
        }
        tracing::info!(
            endpoint = %self.endpoint,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            "waiting before reconnect",
        );

        let sleep = tokio::time::sleep(delay);
        tokio::pin!(sleep);

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => return Flow::Stop,
                () = &mut sleep => return Flow::Connect,
                ctrl = self.control_rx.recv() => match ctrl {
                    None => return Flow::Stop,
                    Some(Control::Connect) => {
                        self.auto_reconnect = true;
                        return Flow::Connect;
                    }
                    Some(Control::Disconnect) => {
                        self.auto_reconnect = false;
                        return Flow::Idle;
                    }
                    Some(Control::Send(cmd)) => {
                        tracing::debug!(command = %cmd, "not connected, command dropped");
                    }
                },
            }
        }
    }

    /// Dials the endpoint and, once open, drives the session to its end.
    async fn attempt(&mut self) -> Attempt {
        let session_id = SessionId::new();
        self.outputs
            .update(|view| view.state = view.state.connecting());
        self.outputs.publish(MonitorEvent::Connecting {
            session_id,
            endpoint: self.endpoint.clone(),
            timestamp: Utc::now(),
        });
        tracing::info!(%session_id, endpoint = %self.endpoint, "connecting to debugger");

        let handshake = connect_async(self.endpoint.clone());
        tokio::pin!(handshake);

        let result = loop {
            tokio::select! {
                _ = self.cancel.cancelled() => return Attempt::Stopped,
                result = &mut handshake => break Some(result),
                ctrl = self.control_rx.recv() => match ctrl {
                    None => return Attempt::Stopped,
                    Some(Control::Connect) => self.auto_reconnect = true,
                    Some(Control::Disconnect) => {
                        self.auto_reconnect = false;
                        break None;
                    }
                    Some(Control::Send(cmd)) => {
                        tracing::debug!(%session_id, command = %cmd, "handshake in flight, command dropped");
                    }
                },
            }
        };

        let Some(result) = result else {
            self.record_close(session_id);
            return Attempt::Failed;
        };

        let ws = match result {
            Ok((ws, _response)) => ws,
            Err(e) => {
                self.record_failure(session_id, &MonitorError::from(e));
                return Attempt::Failed;
            }
        };

        self.backoff.reset();
        self.outputs.update(|view| view.state = ConnectionState::opened());
        self.outputs.publish(MonitorEvent::Connected {
            session_id,
            timestamp: Utc::now(),
        });
        tracing::info!(%session_id, endpoint = %self.endpoint, "connected to debugger");

        match self.run_session(session_id, ws).await {
            SessionEnd::Stopped => Attempt::Stopped,
            SessionEnd::Replaced => {
                self.record_close(session_id);
                Attempt::Replaced
            }
            SessionEnd::Closed => {
                self.record_close(session_id);
                Attempt::Opened
            }
            SessionEnd::Failed(e) => {
                self.record_failure(session_id, &e);
                Attempt::Opened
            }
        }
    }

    /// Read/write loop for one open socket.
    async fn run_session(&mut self, session_id: SessionId, ws: WsStream) -> SessionEnd {
        let (mut sink, mut stream) = ws.split();
        let period = self.heartbeat_interval;
        let mut heartbeat = tokio::time::interval_at(Instant::now() + period, period);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    let _ = sink.close().await;
                    return SessionEnd::Stopped;
                }
                _ = heartbeat.tick() => {
                    if let Err(e) = sink.send(Message::text(Command::Heartbeat.as_frame())).await {
                        return SessionEnd::Failed(e.into());
                    }
                }
                ctrl = self.control_rx.recv() => match ctrl {
                    None => {
                        let _ = sink.close().await;
                        return SessionEnd::Stopped;
                    }
                    Some(Control::Connect) => {
                        self.auto_reconnect = true;
                        let _ = sink.close().await;
                        return SessionEnd::Replaced;
                    }
                    Some(Control::Disconnect) => {
                        self.auto_reconnect = false;
                        let _ = sink.close().await;
                        return SessionEnd::Closed;
                    }
                    Some(Control::Send(cmd)) => {
                        if let Err(e) = sink.send(Message::text(cmd.as_frame())).await {
                            return SessionEnd::Failed(e.into());
                        }
                        tracing::debug!(%session_id, command = %cmd, "command sent");
                    }
                },
                msg = stream.next() => match msg {
                    Some(Ok(Message::Text(text))) => {
                        self.outputs.apply_frame(session_id, |view| on_frame(view, text.as_str()));
                    }
                    Some(Ok(Message::Binary(bytes))) => {
                        self.outputs.apply_frame(session_id, |view| on_binary_frame(view, &bytes));
                    }
                    Some(Ok(Message::Close(frame))) => {
                        tracing::info!(%session_id, ?frame, "debugger closed the connection");
                        return SessionEnd::Closed;
                    }
                    Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => {
                        // Handled automatically by tungstenite.
                    }
                    Some(Err(e)) => return SessionEnd::Failed(e.into()),
                    None => return SessionEnd::Closed,
                },
            }
        }
    }

    fn record_close(&self, session_id: SessionId) {
        self.outputs.update(|view| {
            view.state = view.state.closed();
            view.clear_snapshot();
        });
        self.outputs.publish(MonitorEvent::Closed {
            session_id,
            will_reconnect: self.auto_reconnect,
            timestamp: Utc::now(),
        });
        tracing::info!(%session_id, will_reconnect = self.auto_reconnect, "connection closed");
    }

    fn record_failure(&self, session_id: SessionId, error: &MonitorError) {
        self.outputs.update(|view| {
            view.state = ConnectionState::failed();
            view.clear_snapshot();
        });
        self.outputs.publish(MonitorEvent::TransportError {
            session_id,
            message: error.to_string(),
            will_reconnect: self.auto_reconnect,
            timestamp: Utc::now(),
        });
        tracing::warn!(
            %session_id,
            endpoint = %self.endpoint,
            kind = error.kind_str(),
            error = %error,
            will_reconnect = self.auto_reconnect,
            "connection failed",
        );
    }
}
