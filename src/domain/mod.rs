//! Domain layer: snapshot, connection state, command alphabet, and events.
//!
//! These types are shared by the connection manager, the renderer, and
//! the stub debugger endpoint.

pub mod command;
pub mod event_bus;
pub mod monitor_event;
pub mod session_id;
pub mod snapshot;
pub mod state;

pub use command::Command;
pub use event_bus::EventBus;
pub use monitor_event::MonitorEvent;
pub use session_id::SessionId;
pub use snapshot::{CpuFrame, CpuRegisters, CpuSnapshot};
pub use state::{ConnectionState, MonitorView, Phase};
