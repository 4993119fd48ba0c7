//! Text formatters for snapshot fields.
//!
//! `hex16`/`hex32` mirror the bound-view formatters of a browser front-end:
//! a missing value renders as an empty string, anything else as a
//! zero-padded lowercase hex literal.

use std::fmt::Write as _;

use serde_json::Value;

use crate::domain::CpuSnapshot;
use crate::domain::snapshot::REGISTER_COUNT;

/// MIPS o32 ABI register names, indexed by register number.
const REGISTER_NAMES: [&str; REGISTER_COUNT] = [
    "zero", "at", "v0", "v1", "a0", "a1", "a2", "a3", //
    "t0", "t1", "t2", "t3", "t4", "t5", "t6", "t7", //
    "s0", "s1", "s2", "s3", "s4", "s5", "s6", "s7", //
    "t8", "t9", "k0", "k1", "gp", "sp", "fp", "ra",
];

/// Registers per line in [`render_snapshot`] output.
const REGISTERS_PER_ROW: usize = 4;

/// Formats `value` as `0x` followed by at least `width` hex digits.
#[must_use]
pub fn hex(value: Option<u64>, width: usize) -> String {
    value.map_or_else(String::new, |v| format!("0x{v:0width$x}"))
}

/// 4-digit formatter for 16-bit fields. Non-integers render as `""`.
#[must_use]
pub fn hex16(value: Option<&Value>) -> String {
    hex(value.and_then(Value::as_u64), 4)
}

/// 8-digit formatter for 32-bit fields. Non-integers render as `""`.
#[must_use]
pub fn hex32(value: Option<&Value>) -> String {
    hex(value.and_then(Value::as_u64), 8)
}

/// Returns the ABI name of register `n`, or `rN` outside `0..32`.
#[must_use]
pub fn register_name(n: usize) -> String {
    REGISTER_NAMES
        .get(n)
        .map_or_else(|| format!("r{n}"), |name| (*name).to_string())
}

/// Renders a snapshot for a terminal.
///
/// Snapshots carrying the emulator's `cpu` object become a register
/// table; anything else is pretty-printed JSON.
#[must_use]
pub fn render_snapshot(snapshot: &CpuSnapshot) -> String {
    let Some(cpu) = snapshot.cpu_registers() else {
        return serde_json::to_string_pretty(snapshot.as_value()).unwrap_or_default();
    };

    let mut out = String::new();
    let _ = writeln!(
        out,
        "pc {}  hi {}  lo {}",
        hex(Some(cpu.pc.into()), 8),
        hex(Some(cpu.hi.into()), 8),
        hex(Some(cpu.lo.into()), 8),
    );
    for (row, regs) in cpu.reg.chunks(REGISTERS_PER_ROW).enumerate() {
        let cells: Vec<String> = regs
            .iter()
            .enumerate()
            .map(|(col, value)| {
                let n = row * REGISTERS_PER_ROW + col;
                format!("{:>4} {}", register_name(n), hex(Some((*value).into()), 8))
            })
            .collect();
        let _ = writeln!(out, "{}", cells.join("  "));
    }
    out
}
