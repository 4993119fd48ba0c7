//! Terminal front-end: stdin actions and printed view updates.

use crate::domain::{MonitorView, Phase};
use crate::error::MonitorError;
use crate::monitor::Monitor;
use crate::render::render_snapshot;

/// User action typed on stdin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Open a socket and re-enable auto-reconnect.
    Connect,
    /// Close the socket and disable auto-reconnect.
    Disconnect,
    /// Toggle emulation pause.
    Pause,
    /// Single-step the CPU.
    Step,
    /// Leave the front-end.
    Quit,
}

impl Action {
    /// Parses one input line. Blank or unknown input is `None`.
    #[must_use]
    pub fn parse(line: &str) -> Option<Self> {
        match line.trim().to_ascii_lowercase().as_str() {
            "c" | "connect" => Some(Self::Connect),
            "d" | "disconnect" => Some(Self::Disconnect),
            "p" | "pause" => Some(Self::Pause),
            "s" | "step" => Some(Self::Step),
            "q" | "quit" | "exit" => Some(Self::Quit),
            _ => None,
        }
    }

    /// Forwards the action to `monitor`. `Quit` is a no-op here.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::Stopped`] if the monitor has shut down.
    pub fn dispatch(self, monitor: &Monitor) -> Result<(), MonitorError> {
        match self {
            Self::Connect => monitor.connect(),
            Self::Disconnect => monitor.disconnect(),
            Self::Pause => monitor.pause(),
            Self::Step => monitor.step(),
            Self::Quit => Ok(()),
        }
    }
}

/// One-line help printed at startup.
pub const HELP: &str = "commands: [c]onnect [d]isconnect [p]ause [s]tep [q]uit";

/// Returns the status line for a view.
#[must_use]
pub fn status_line(view: &MonitorView) -> String {
    let phase = match view.state.phase() {
        Phase::Connected => "connected",
        Phase::Connecting => "connecting",
        Phase::Disconnected => "disconnected",
    };
    if view.state.error {
        format!("[{phase}, error]")
    } else {
        format!("[{phase}]")
    }
}

/// Tracks what has already been printed so only changes are shown.
#[derive(Debug, Default)]
pub struct Printer {
    last_status: Option<String>,
    last_snapshot: Option<serde_json::Value>,
}

impl Printer {
    /// Returns the text to print for `view`, or `None` if nothing changed.
    pub fn update(&mut self, view: &MonitorView) -> Option<String> {
        let mut out = Vec::new();

        let status = status_line(view);
        if self.last_status.as_ref() != Some(&status) {
            out.push(status.clone());
            self.last_status = Some(status);
        }

        if !view.snapshot.is_empty()
            && self.last_snapshot.as_ref() != Some(view.snapshot.as_value())
        {
            out.push(render_snapshot(&view.snapshot));
            self.last_snapshot = Some(view.snapshot.as_value().clone());
        } else if view.snapshot.is_empty() {
            self.last_snapshot = None;
        }

        (!out.is_empty()).then(|| out.join("\n"))
    }
}
