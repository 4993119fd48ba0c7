//! # emu-monitor
//!
//! Live CPU-state monitor and control client for an emulator's debugger
//! WebSocket endpoint.
//!
//! A [`monitor::Monitor`] keeps one socket open to the debugger, sends a
//! keepalive `"."` every 100 ms, replaces its snapshot with every JSON
//! document the debugger sends back, and forwards `"P"` (pause) and `"S"`
//! (step) on request. Closed connections are reopened automatically until
//! the user disconnects.
//!
//! ## Architecture
//!
//! ```text
//! Front-end (console/, main.rs)
//!     │  connect / disconnect / pause / step
//!     ├── Monitor handle (monitor/)
//!     │     └── Supervisor task ── WebSocket ──► debugger endpoint
//!     │
//!     ├── MonitorView (watch) + EventBus (broadcast) (domain/)
//!     └── Formatters (render/)
//!
//! Stub debugger (stub/) ── axum WebSocket endpoint for local runs and tests
//! ```

pub mod config;
pub mod console;
pub mod domain;
pub mod error;
pub mod monitor;
pub mod render;
pub mod stub;
