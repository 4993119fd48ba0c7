//! Monitor and stub configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`). Every key has a default, so an empty
//! environment yields a monitor dialling a local debugger on port 3000.

use std::net::SocketAddr;
use std::time::Duration;

use url::Url;

use crate::error::MonitorError;
use crate::monitor::reconnect::{BackoffConfig, ReconnectPolicy};

/// Endpoint dialled when `MONITOR_ENDPOINT` is not set.
pub const DEFAULT_ENDPOINT: &str = "ws://127.0.0.1:3000";

/// Heartbeat period when `MONITOR_HEARTBEAT_MS` is not set.
pub const DEFAULT_HEARTBEAT: Duration = Duration::from_millis(100);

/// Connection manager configuration.
///
/// Loaded once at startup via [`MonitorConfig::from_env`], or built with
/// [`MonitorConfig::new`] and adjusted field by field.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Debugger WebSocket URL (`ws://` or `wss://`).
    pub endpoint: String,

    /// Period between keepalive frames while connected.
    pub heartbeat_interval: Duration,

    /// Whether the monitor connects as soon as it starts.
    pub auto_connect: bool,

    /// What to do between connection attempts.
    pub reconnect: ReconnectPolicy,

    /// Capacity of the event bus broadcast channel.
    pub event_capacity: usize,
}

impl MonitorConfig {
    /// Creates a configuration for `endpoint` with every other setting at
    /// its default.
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            heartbeat_interval: DEFAULT_HEARTBEAT,
            auto_connect: true,
            reconnect: ReconnectPolicy::default(),
            event_capacity: 256,
        }
    }

    /// Loads configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::InvalidEndpoint`] if `MONITOR_ENDPOINT` is
    /// not a WebSocket URL, or [`MonitorError::Config`] if the heartbeat
    /// period is zero.
    pub fn from_env() -> Result<Self, MonitorError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Same as [`MonitorConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, MonitorError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let endpoint = lookup("MONITOR_ENDPOINT").unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());

        let heartbeat_ms = parse_key(&lookup, "MONITOR_HEARTBEAT_MS", 100u64);

        let auto_connect = parse_key_bool(&lookup, "MONITOR_AUTO_CONNECT", true);

        let reconnect = if parse_key_bool(&lookup, "MONITOR_RECONNECT_BACKOFF", true) {
            let defaults = BackoffConfig::default();
            ReconnectPolicy::Backoff(BackoffConfig {
                initial_delay: Duration::from_millis(parse_key(
                    &lookup,
                    "MONITOR_RECONNECT_INITIAL_MS",
                    duration_ms(defaults.initial_delay),
                )),
                max_delay: Duration::from_millis(parse_key(
                    &lookup,
                    "MONITOR_RECONNECT_MAX_MS",
                    duration_ms(defaults.max_delay),
                )),
                multiplier: defaults.multiplier,
            })
        } else {
            ReconnectPolicy::Immediate
        };

        let event_capacity = parse_key(&lookup, "MONITOR_EVENT_CAPACITY", 256usize);

        let config = Self {
            endpoint,
            heartbeat_interval: Duration::from_millis(heartbeat_ms),
            auto_connect,
            reconnect,
            event_capacity,
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks the settings a running monitor depends on.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::InvalidEndpoint`] if the endpoint is not a
    /// WebSocket URL, or [`MonitorError::Config`] if the heartbeat period
    /// is zero.
    pub fn validate(&self) -> Result<(), MonitorError> {
        validate_endpoint(&self.endpoint)?;
        if self.heartbeat_interval.is_zero() {
            return Err(MonitorError::Config(
                "heartbeat interval must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Stub debugger configuration.
#[derive(Debug, Clone)]
pub struct StubConfig {
    /// Socket address to bind the stub endpoint to.
    pub listen_addr: SocketAddr,

    /// Instructions executed per heartbeat while the CPU is running.
    pub batch_size: u32,
}

impl StubConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::Config`] if `STUB_LISTEN_ADDR` is set but
    /// cannot be parsed as a [`SocketAddr`].
    pub fn from_env() -> Result<Self, MonitorError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Same as [`StubConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, MonitorError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw_addr = lookup("STUB_LISTEN_ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_string());
        let listen_addr = raw_addr
            .parse()
            .map_err(|e| MonitorError::Config(format!("STUB_LISTEN_ADDR={raw_addr}: {e}")))?;

        Ok(Self {
            listen_addr,
            batch_size: parse_key(&lookup, "STUB_BATCH_SIZE", 70),
        })
    }
}

/// Checks that `endpoint` names a WebSocket URL.
///
/// # Errors
///
/// Returns [`MonitorError::InvalidEndpoint`] for any other scheme, a URL
/// that does not parse, or a missing host or zero port.
pub fn validate_endpoint(endpoint: &str) -> Result<(), MonitorError> {
    let invalid = || MonitorError::InvalidEndpoint(endpoint.to_string());

    // `ws:///path` would otherwise parse with `path` as the host.
    match endpoint.split_once("://") {
        Some((_, rest)) if !rest.is_empty() && !rest.starts_with('/') => {}
        _ => return Err(invalid()),
    }

    let url = Url::parse(endpoint).map_err(|_| invalid())?;
    if url.scheme() != "ws" && url.scheme() != "wss" {
        return Err(invalid());
    }
    if url.host_str().is_none_or(str::is_empty) || url.port() == Some(0) {
        return Err(invalid());
    }
    Ok(())
}

/// Parses a key as `T`, returning `default` on missing or invalid values.
fn parse_key<T, F>(lookup: &F, key: &str, default: T) -> T
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    lookup(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

/// Parses a key as a boolean. Accepts `"true"`, `"1"`, `"false"`, `"0"`
/// (case-insensitive). Returns `default` otherwise.
fn parse_key_bool<F>(lookup: &F, key: &str, default: bool) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key).map(|v| v.to_ascii_lowercase()).as_deref() {
        Some("true" | "1") => true,
        Some("false" | "0") => false,
        _ => default,
    }
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
