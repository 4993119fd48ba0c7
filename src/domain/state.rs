//! Observable connection state and the view published to front-ends.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::CpuSnapshot;

/// Connection flags as shown to the user.
///
/// After a terminal transition at most one of `connected` and `error` is
/// set. `connecting` is only set while a handshake is in flight.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConnectionState {
    /// A handshake is in flight.
    pub connecting: bool,
    /// The socket is open.
    pub connected: bool,
    /// The last connection attempt or session ended in a transport error.
    pub error: bool,
}

/// Coarse lifecycle phase derived from [`ConnectionState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// No socket and no handshake in flight.
    Disconnected,
    /// Handshake in flight.
    Connecting,
    /// Socket open.
    Connected,
}

impl ConnectionState {
    /// State while a handshake is in flight. Keeps the previous error flag
    /// so a failing endpoint stays flagged between attempts.
    #[must_use]
    pub const fn connecting(self) -> Self {
        Self {
            connecting: true,
            connected: false,
            error: self.error,
        }
    }

    /// State after a successful open.
    #[must_use]
    pub const fn opened() -> Self {
        Self {
            connecting: false,
            connected: true,
            error: false,
        }
    }

    /// State after a clean close.
    #[must_use]
    pub const fn closed(self) -> Self {
        Self {
            connecting: false,
            connected: false,
            error: self.error,
        }
    }

    /// State after a transport error.
    #[must_use]
    pub const fn failed() -> Self {
        Self {
            connecting: false,
            connected: false,
            error: true,
        }
    }

    /// Returns the lifecycle phase.
    #[must_use]
    pub const fn phase(&self) -> Phase {
        if self.connected {
            Phase::Connected
        } else if self.connecting {
            Phase::Connecting
        } else {
            Phase::Disconnected
        }
    }
}

/// Everything a front-end binds to: flags plus the live snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MonitorView {
    /// Connection flags.
    pub state: ConnectionState,
    /// Last snapshot received on the current session.
    pub snapshot: CpuSnapshot,
    /// When `snapshot` was last replaced. `None` while empty.
    pub updated_at: Option<DateTime<Utc>>,
}

impl MonitorView {
    /// Drops the snapshot, as happens on every disconnect.
    pub fn clear_snapshot(&mut self) {
        self.snapshot = CpuSnapshot::empty();
        self.updated_at = None;
    }
}
