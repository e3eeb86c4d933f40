//! Human-readable status lines for fetched rates.

use crate::core::{FetchStatus, RATE_EPSILON};
use chrono::{DateTime, Local};

pub const STATUS_SEPARATOR: &str = " | ";
pub const UNAVAILABLE_RATE: &str = "00.0000";

/// Builds the status line for one source.
///
/// `diff` is `None` when the reading could not be persisted.
pub fn format_status(
    status: FetchStatus,
    captured_at: DateTime<Local>,
    diff: Option<f64>,
    source_name: &str,
) -> String {
    if status.is_failure() {
        return format!("{source_name} FAILED: {status}");
    }

    let time = captured_at.format("%H:%M");
    match diff {
        Some(d) if d.abs() > RATE_EPSILON => {
            let arrow = if d > 0.0 { '▲' } else { '▼' };
            format!("{source_name} UPDATED: {time} ({arrow} {:.4})", d.abs())
        }
        Some(_) => format!("{source_name} UPDATED: {time} (unchanged)"),
        None => format!("{source_name} UPDATED: {time} (not saved)"),
    }
}

pub fn combine(primary: &str, secondary: &str) -> String {
    format!("{primary}{STATUS_SEPARATOR}{secondary}")
}

/// Four-decimal rate text, or the placeholder when no rate is available.
pub fn format_rate(value: Option<f64>) -> String {
    match value {
        Some(v) if v > 0.0 => format!("{v:.4}"),
        _ => UNAVAILABLE_RATE.to_string(),
    }
}

/// Signed spread of the peer-market rate over the official one.
pub fn format_spread(primary: Option<f64>, secondary: Option<f64>) -> String {
    format!("{:+.4}", secondary.unwrap_or(0.0) - primary.unwrap_or(0.0))
}
