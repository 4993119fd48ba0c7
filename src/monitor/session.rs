//! Inbound frame handling for an open session.

use chrono::Utc;

use crate::domain::{CpuSnapshot, MonitorView};
use crate::error::MonitorError;

/// Replaces the view's snapshot with the document carried by `raw`.
///
/// There is no merge with the previous snapshot: keys absent from `raw`
/// disappear. On a parse failure the view is left untouched.
///
/// # Errors
///
/// Returns [`MonitorError::MalformedFrame`] if `raw` is not valid JSON.
pub fn on_frame(view: &mut MonitorView, raw: &str) -> Result<(), MonitorError> {
    let snapshot = CpuSnapshot::from_frame(raw)?;
    view.snapshot = snapshot;
    view.updated_at = Some(Utc::now());
    Ok(())
}

/// Same as [`on_frame`] for binary frames, which must hold UTF-8 JSON.
///
/// # Errors
///
/// Returns [`MonitorError::MalformedFrame`] if `raw` is not UTF-8 or not
/// valid JSON.
pub fn on_binary_frame(view: &mut MonitorView, raw: &[u8]) -> Result<(), MonitorError> {
    let snapshot: CpuSnapshot = serde_json::from_slice(raw)?;
    view.snapshot = snapshot;
    view.updated_at = Some(Utc::now());
    Ok(())
}
