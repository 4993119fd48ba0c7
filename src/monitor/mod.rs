//! Connection manager for a remote emulator debugger.
//!
//! [`Monitor`] is the handle a front-end holds. It keeps at most one
//! WebSocket open to the configured endpoint, sends a keepalive frame on a
//! fixed period while connected, publishes every inbound JSON snapshot,
//! and relays pause/step commands.
//!
//! ```text
//! front-end ──connect/disconnect/pause/step──► Monitor ─mpsc─► Supervisor task
//!     ▲                                                           │
//!     └──── watch<MonitorView> / broadcast<MonitorEvent> ◄────────┘
//! ```

pub mod reconnect;
pub mod session;
mod supervisor;

use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::MonitorConfig;
use crate::domain::{Command, ConnectionState, EventBus, MonitorEvent, MonitorView};
use crate::error::MonitorError;
use supervisor::{Control, Supervisor};

pub use session::on_frame;

/// Handle to a running connection manager.
///
/// Created with [`Monitor::start`]. Every operation is forwarded to a
/// background task, which owns the socket and the auto-reconnect flag.
/// Dropping the handle stops the task and closes any open socket.
#[derive(Debug)]
pub struct Monitor {
    control_tx: mpsc::UnboundedSender<Control>,
    view_rx: watch::Receiver<MonitorView>,
    events: EventBus,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl Monitor {
    /// Spawns the connection manager on the current Tokio runtime.
    ///
    /// With `config.auto_connect` set (the default) the first connection
    /// attempt starts immediately.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::InvalidEndpoint`] if the endpoint is not a
    /// WebSocket URL, or [`MonitorError::Config`] if the heartbeat period
    /// is zero.
    pub fn start(config: MonitorConfig) -> Result<Self, MonitorError> {
        config.validate()?;

        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let (view_tx, view_rx) = watch::channel(MonitorView::default());
        let events = EventBus::new(config.event_capacity);
        let cancel = CancellationToken::new();

        let supervisor = Supervisor::new(
            &config,
            view_tx,
            events.clone(),
            control_rx,
            cancel.clone(),
        );
        let task = tokio::spawn(supervisor.run());

        tracing::debug!(endpoint = %config.endpoint, "monitor started");

        Ok(Self {
            control_tx,
            view_rx,
            events,
            cancel,
            task: Some(task),
        })
    }

    /// Opens a new socket and re-enables auto-reconnect.
    ///
    /// An open socket is closed first, so at most one is ever live.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::Stopped`] if the monitor has shut down.
    pub fn connect(&self) -> Result<(), MonitorError> {
        self.control(Control::Connect)
    }

    /// Closes the socket and disables auto-reconnect.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::Stopped`] if the monitor has shut down.
    pub fn disconnect(&self) -> Result<(), MonitorError> {
        self.control(Control::Disconnect)
    }

    /// Sends `"P"`, toggling emulation pause.
    ///
    /// No acknowledgement is awaited. While disconnected the command is
    /// dropped.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::Stopped`] if the monitor has shut down.
    pub fn pause(&self) -> Result<(), MonitorError> {
        tracing::info!("pause emulation");
        self.control(Control::Send(Command::Pause))
    }

    /// Sends `"S"`, executing a single instruction. Same contract as
    /// [`Monitor::pause`].
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::Stopped`] if the monitor has shut down.
    pub fn step(&self) -> Result<(), MonitorError> {
        tracing::info!("single step");
        self.control(Control::Send(Command::Step))
    }

    /// Returns a copy of the current view.
    #[must_use]
    pub fn view(&self) -> MonitorView {
        self.view_rx.borrow().clone()
    }

    /// Returns the current connection flags.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.view_rx.borrow().state
    }

    /// Returns a receiver notified on every view change.
    #[must_use]
    pub fn subscribe_view(&self) -> watch::Receiver<MonitorView> {
        self.view_rx.clone()
    }

    /// Returns a receiver for all future lifecycle events.
    #[must_use]
    pub fn subscribe_events(&self) -> broadcast::Receiver<MonitorEvent> {
        self.events.subscribe()
    }

    /// Stops the background task and waits for it to exit.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take()
            && let Err(e) = task.await
        {
            tracing::error!(error = %e, "monitor task failed");
        }
    }

    fn control(&self, control: Control) -> Result<(), MonitorError> {
        self.control_tx
            .send(control)
            .map_err(|_| MonitorError::Stopped)
    }
}

impl Drop for Monitor {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
