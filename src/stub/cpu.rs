//! Deterministic stand-in for an emulated CPU.
//!
//! The stub does not decode instructions. It walks the program counter
//! through a small loop at the BIOS reset vector and updates a few
//! registers, which is enough for snapshots to change visibly.

use crate::domain::snapshot::REGISTER_COUNT;
use crate::domain::{Command, CpuFrame, CpuRegisters};

/// BIOS reset vector of a MIPS R3000A.
pub const RESET_VECTOR: u32 = 0xbfc0_0000;

/// Size in bytes of the loop the program counter walks.
const LOOP_BYTES: u32 = 0x1000;

/// Register number of `t0`, used as an instruction counter.
const COUNTER_REG: usize = 8;

/// Register number of `sp`.
const STACK_REG: usize = 29;

/// Simulated register file plus run/pause state.
#[derive(Debug, Clone)]
pub struct SimulatedCpu {
    regs: CpuRegisters,
    paused: bool,
    executed: u64,
}

impl SimulatedCpu {
    /// Creates a running CPU at the reset vector.
    #[must_use]
    pub fn new() -> Self {
        let mut reg = [0u32; REGISTER_COUNT];
        if let Some(sp) = reg.get_mut(STACK_REG) {
            *sp = 0x801f_fff0;
        }
        Self {
            regs: CpuRegisters {
                reg,
                pc: RESET_VECTOR,
                lo: 0,
                hi: 0,
            },
            paused: false,
            executed: 0,
        }
    }

    /// Returns `true` while emulation is paused.
    #[must_use]
    pub const fn is_paused(&self) -> bool {
        self.paused
    }

    /// Returns the number of instructions executed so far.
    #[must_use]
    pub const fn executed(&self) -> u64 {
        self.executed
    }

    /// Returns the program counter.
    #[must_use]
    pub const fn pc(&self) -> u32 {
        self.regs.pc
    }

    /// Applies one control command.
    ///
    /// A heartbeat runs `batch` instructions unless paused, pause toggles
    /// the paused flag, and step runs exactly one instruction.
    pub fn apply(&mut self, command: Command, batch: u32) {
        match command {
            Command::Heartbeat => {
                if !self.paused {
                    for _ in 0..batch {
                        self.execute_one();
                    }
                }
            }
            Command::Pause => self.paused = !self.paused,
            Command::Step => self.execute_one(),
        }
    }

    /// Returns the wire frame describing the current registers.
    #[must_use]
    pub fn frame(&self) -> CpuFrame {
        CpuFrame {
            cpu: self.regs.clone(),
        }
    }

    fn execute_one(&mut self) {
        self.executed = self.executed.wrapping_add(1);
        let offset = self.regs.pc.wrapping_sub(RESET_VECTOR).wrapping_add(4) % LOOP_BYTES;
        self.regs.pc = RESET_VECTOR.wrapping_add(offset);
        if let Some(counter) = self.regs.reg.get_mut(COUNTER_REG) {
            *counter = counter.wrapping_add(1);
        }
        self.regs.lo = self.executed as u32;
        self.regs.hi = (self.executed >> 32) as u32;
    }
}

impl Default for SimulatedCpu {
    fn default() -> Self {
        Self::new()
    }
}
