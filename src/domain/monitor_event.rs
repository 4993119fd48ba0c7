//! Lifecycle events emitted by the connection manager.
//!
//! Every transition of the session task publishes a [`MonitorEvent`]
//! through the [`super::EventBus`]. Front-ends and tests subscribe to
//! follow the connection without polling the view.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::SessionId;

/// Event emitted on every connection state change or inbound frame.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum MonitorEvent {
    /// A handshake was started.
    Connecting {
        /// Session identifier.
        session_id: SessionId,
        /// Endpoint being dialled.
        endpoint: String,
        /// Attempt timestamp.
        timestamp: DateTime<Utc>,
    },

    /// The socket opened.
    Connected {
        /// Session identifier.
        session_id: SessionId,
        /// Open timestamp.
        timestamp: DateTime<Utc>,
    },

    /// A snapshot replaced the previous one.
    Snapshot {
        /// Session identifier.
        session_id: SessionId,
        /// Receive timestamp.
        timestamp: DateTime<Utc>,
    },

    /// An inbound frame was not valid JSON and was discarded.
    MalformedFrame {
        /// Session identifier.
        session_id: SessionId,
        /// Parser error message.
        message: String,
        /// Receive timestamp.
        timestamp: DateTime<Utc>,
    },

    /// The socket closed cleanly, by either side.
    Closed {
        /// Session identifier.
        session_id: SessionId,
        /// Whether an automatic reconnect follows.
        will_reconnect: bool,
        /// Close timestamp.
        timestamp: DateTime<Utc>,
    },

    /// The handshake or an open socket failed.
    TransportError {
        /// Session identifier.
        session_id: SessionId,
        /// Error message.
        message: String,
        /// Whether an automatic reconnect follows.
        will_reconnect: bool,
        /// Failure timestamp.
        timestamp: DateTime<Utc>,
    },
}

impl MonitorEvent {
    /// Returns the session ID associated with this event.
    #[must_use]
    pub const fn session_id(&self) -> SessionId {
        match self {
            Self::Connecting { session_id, .. }
            | Self::Connected { session_id, .. }
            | Self::Snapshot { session_id, .. }
            | Self::MalformedFrame { session_id, .. }
            | Self::Closed { session_id, .. }
            | Self::TransportError { session_id, .. } => *session_id,
        }
    }

    /// Returns the event type as a static string slice.
    #[must_use]
    pub const fn event_type_str(&self) -> &'static str {
        match self {
            Self::Connecting { .. } => "connecting",
            Self::Connected { .. } => "connected",
            Self::Snapshot { .. } => "snapshot",
            Self::MalformedFrame { .. } => "malformed_frame",
            Self::Closed { .. } => "closed",
            Self::TransportError { .. } => "transport_error",
        }
    }

    /// Returns `true` for events that end a session.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed { .. } | Self::TransportError { .. })
    }
}
