//! CPU snapshot documents received from the debugger.
//!
//! A [`CpuSnapshot`] is an opaque JSON document. The monitor never merges
//! or validates it: each inbound frame replaces the previous snapshot
//! wholesale. [`CpuRegisters`] is an optional typed view used by the
//! renderer when the document carries the emulator's `cpu` object.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::MonitorError;

/// Number of general-purpose registers in a MIPS R3000A core.
pub const REGISTER_COUNT: usize = 32;

/// Full emulator state as last reported by the debugger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CpuSnapshot(Value);

impl CpuSnapshot {
    /// Returns the empty snapshot (`{}`), shown while disconnected.
    #[must_use]
    pub fn empty() -> Self {
        Self(Value::Object(Map::new()))
    }

    /// Parses a raw inbound frame.
    ///
    /// Any well-formed JSON document is accepted, including non-objects.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::MalformedFrame`] if `raw` is not valid JSON.
    pub fn from_frame(raw: &str) -> Result<Self, MonitorError> {
        Ok(Self(serde_json::from_str(raw)?))
    }

    /// Returns `true` for the empty object.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.as_object().is_some_and(Map::is_empty)
    }

    /// Looks up a top-level field.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Returns the underlying JSON document.
    #[must_use]
    pub const fn as_value(&self) -> &Value {
        &self.0
    }

    /// Decodes the `cpu` object, if present and well-shaped.
    #[must_use]
    pub fn cpu_registers(&self) -> Option<CpuRegisters> {
        let cpu = self.0.get("cpu")?;
        serde_json::from_value(cpu.clone()).ok()
    }
}

impl Default for CpuSnapshot {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<Value> for CpuSnapshot {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// Register file of the emulated CPU as sent by the debugger endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpuRegisters {
    /// General-purpose registers `r0`..`r31`.
    pub reg: [u32; REGISTER_COUNT],
    /// Program counter.
    pub pc: u32,
    /// `LO` multiply/divide result register.
    pub lo: u32,
    /// `HI` multiply/divide result register.
    pub hi: u32,
}

/// Wire envelope `{"cpu": {...}}` produced by the debugger endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CpuFrame {
    /// CPU register file.
    pub cpu: CpuRegisters,
}
