//! Monitor error types.
//!
//! [`MonitorError`] is the central error type of the crate. Transport
//! failures never reach the caller of a UI action: the session task
//! records them on the view and the event bus instead.

use tokio_tungstenite::tungstenite;

/// Error enum for the connection manager, configuration, and stub.
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    /// Endpoint URL is not a `ws://` or `wss://` URL.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// WebSocket handshake or I/O failure.
    #[error("transport error: {0}")]
    Transport(#[from] tungstenite::Error),

    /// Inbound frame was not valid JSON.
    #[error("malformed frame: {0}")]
    MalformedFrame(#[from] serde_json::Error),

    /// The controller task has exited; no further operations are possible.
    #[error("monitor stopped")]
    Stopped,

    /// A configuration value could not be used.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Socket-level failure outside the WebSocket layer (e.g. bind).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl MonitorError {
    /// Returns the error kind as a static string slice, for log fields.
    #[must_use]
    pub const fn kind_str(&self) -> &'static str {
        match self {
            Self::InvalidEndpoint(_) => "invalid_endpoint",
            Self::Transport(_) => "transport",
            Self::MalformedFrame(_) => "malformed_frame",
            Self::Stopped => "stopped",
            Self::Config(_) => "config",
            Self::Io(_) => "io",
        }
    }
}
