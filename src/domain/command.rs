//! Single-character control alphabet understood by the debugger.

use std::fmt;

use serde::Serialize;

/// Outbound control command. Each one travels as a one-character text frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    /// Keepalive, `"."`.
    Heartbeat,
    /// Toggle emulation pause, `"P"`.
    Pause,
    /// Execute a single instruction, `"S"`.
    Step,
}

impl Command {
    /// Returns the frame payload for this command.
    #[must_use]
    pub const fn as_frame(self) -> &'static str {
        match self {
            Self::Heartbeat => ".",
            Self::Pause => "P",
            Self::Step => "S",
        }
    }

    /// Parses an inbound frame. Anything outside the alphabet is `None`.
    #[must_use]
    pub fn from_frame(frame: &str) -> Option<Self> {
        match frame {
            "." => Some(Self::Heartbeat),
            "P" => Some(Self::Pause),
            "S" => Some(Self::Step),
            _ => None,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_frame())
    }
}
