//! Shared helpers for the integration tests.

#![allow(dead_code, clippy::panic)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use emu_monitor::config::{MonitorConfig, StubConfig};
use emu_monitor::domain::MonitorEvent;
use emu_monitor::stub::{self, StatsSnapshot, StubHandle};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::{Mutex, broadcast};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;

/// Upper bound on any single wait in these tests.
pub const WAIT: Duration = Duration::from_secs(5);

/// Starts a stub debugger on an ephemeral local port.
pub async fn start_stub() -> StubHandle {
    let config = StubConfig {
        listen_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
        batch_size: 70,
    };
    let Ok(handle) = stub::start(&config).await else {
        panic!("stub failed to bind");
    };
    handle
}

/// Monitor config that waits for an explicit `connect()`.
pub fn manual_config(endpoint: String, heartbeat: Duration) -> MonitorConfig {
    let mut config = MonitorConfig::new(endpoint);
    config.auto_connect = false;
    config.heartbeat_interval = heartbeat;
    config
}

/// Waits for the next event of the given type, skipping others.
pub async fn wait_for(rx: &mut broadcast::Receiver<MonitorEvent>, event_type: &str) -> MonitorEvent {
    let found = tokio::time::timeout(WAIT, async {
        loop {
            match rx.recv().await {
                Ok(event) if event.event_type_str() == event_type => return Some(event),
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    })
    .await;

    match found {
        Ok(Some(event)) => event,
        Ok(None) => panic!("event bus closed while waiting for {event_type}"),
        Err(_) => panic!("timed out waiting for {event_type}"),
    }
}

/// Polls the stub's counters until `done` holds.
pub async fn wait_for_stats<F>(stub: &StubHandle, done: F)
where
    F: Fn(&StatsSnapshot) -> bool,
{
    let reached = tokio::time::timeout(WAIT, async {
        while !done(&stub.stats()) {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    if reached.is_err() {
        panic!("stub counters never settled: {:?}", stub.stats());
    }
}

/// Returns a local address nothing is listening on.
pub async fn unused_addr() -> SocketAddr {
    let Ok(listener) = TcpListener::bind("127.0.0.1:0").await else {
        panic!("bind failed");
    };
    let Ok(addr) = listener.local_addr() else {
        panic!("no local addr");
    };
    drop(listener);
    addr
}

/// WebSocket server that sends a fixed list of frames to each client and
/// records what clients send back.
pub struct ScriptedServer {
    pub addr: SocketAddr,
    pub received: Arc<Mutex<Vec<String>>>,
    pub accepted: Arc<AtomicUsize>,
    task: JoinHandle<()>,
}

impl ScriptedServer {
    pub async fn start(frames: Vec<&'static str>) -> Self {
        let Ok(listener) = TcpListener::bind("127.0.0.1:0").await else {
            panic!("bind failed");
        };
        let Ok(addr) = listener.local_addr() else {
            panic!("no local addr");
        };
        let received = Arc::new(Mutex::new(Vec::new()));
        let accepted = Arc::new(AtomicUsize::new(0));

        let task = {
            let received = Arc::clone(&received);
            let accepted = Arc::clone(&accepted);
            tokio::spawn(async move {
                while let Ok((stream, _)) = listener.accept().await {
                    accepted.fetch_add(1, Ordering::SeqCst);
                    let frames = frames.clone();
                    let received = Arc::clone(&received);
                    tokio::spawn(async move {
                        let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await else {
                            return;
                        };
                        for frame in frames {
                            if ws.send(Message::text(frame)).await.is_err() {
                                return;
                            }
                        }
                        while let Some(Ok(msg)) = ws.next().await {
                            if let Message::Text(text) = msg {
                                received.lock().await.push(text.as_str().to_string());
                            }
                        }
                    });
                }
            })
        };

        Self {
            addr,
            received,
            accepted,
            task,
        }
    }

    pub fn endpoint(&self) -> String {
        format!("ws://{}", self.addr)
    }
}

impl Drop for ScriptedServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}
