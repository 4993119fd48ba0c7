//! Shared state injected into the stub's Axum handlers.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use tokio::sync::{Mutex, broadcast};

use super::cpu::SimulatedCpu;
use crate::domain::Command;

/// Shared state available to all stub handlers via Axum's `State`
/// extractor.
#[derive(Debug, Clone)]
pub struct StubState {
    /// The one CPU every client observes and controls.
    pub cpu: Arc<Mutex<SimulatedCpu>>,
    /// Frame and connection counters.
    pub stats: Arc<StubStats>,
    /// Instructions run per heartbeat while the CPU is running.
    pub batch_size: u32,
    /// Fires to force every open connection closed.
    pub kick: broadcast::Sender<()>,
}

impl StubState {
    /// Creates state for a fresh, running CPU.
    #[must_use]
    pub fn new(batch_size: u32) -> Self {
        let (kick, _) = broadcast::channel(4);
        Self {
            cpu: Arc::new(Mutex::new(SimulatedCpu::new())),
            stats: Arc::new(StubStats::default()),
            batch_size,
            kick,
        }
    }
}

/// Counters updated by every connection.
#[derive(Debug, Default)]
pub struct StubStats {
    connections: AtomicU64,
    open: AtomicU64,
    heartbeats: AtomicU64,
    pauses: AtomicU64,
    steps: AtomicU64,
    unknown: AtomicU64,
}

/// Point-in-time copy of [`StubStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    /// WebSocket connections accepted since start.
    pub connections: u64,
    /// Connections currently open.
    pub open: u64,
    /// `"."` frames received.
    pub heartbeats: u64,
    /// `"P"` frames received.
    pub pauses: u64,
    /// `"S"` frames received.
    pub steps: u64,
    /// Frames outside the command alphabet.
    pub unknown: u64,
}

impl StubStats {
    /// Records an accepted connection.
    pub fn connection_opened(&self) {
        self.connections.fetch_add(1, Ordering::Relaxed);
        self.open.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a connection ending.
    pub fn connection_closed(&self) {
        self.open.fetch_sub(1, Ordering::Relaxed);
    }

    /// Records one inbound frame.
    pub fn frame_received(&self, command: Option<Command>) {
        let counter = match command {
            Some(Command::Heartbeat) => &self.heartbeats,
            Some(Command::Pause) => &self.pauses,
            Some(Command::Step) => &self.steps,
            None => &self.unknown,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns the current counter values.
    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            connections: self.connections.load(Ordering::Relaxed),
            open: self.open.load(Ordering::Relaxed),
            heartbeats: self.heartbeats.load(Ordering::Relaxed),
            pauses: self.pauses.load(Ordering::Relaxed),
            steps: self.steps.load(Ordering::Relaxed),
            unknown: self.unknown.load(Ordering::Relaxed),
        }
    }
}
