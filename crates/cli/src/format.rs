//! Human-readable rendering of times, sizes and ages.

use chrono::{DateTime, Utc};

/// `m:ss`, truncating fractions. Unknown or non-positive values render as
/// `0:00`.
pub fn format_time(seconds: f64) -> String {
    if !seconds.is_finite() || seconds <= 0.0 {
        return "0:00".to_string();
    }
    let total = seconds.floor() as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

/// `mm:ss.cc` with centiseconds, used for trim handles.
pub fn format_time_ms(seconds: f64) -> String {
    if !seconds.is_finite() || seconds <= 0.0 {
        return "00:00.00".to_string();
    }
    let total = seconds.floor() as u64;
    let centis = ((seconds.fract() * 100.0).floor() as u64).min(99);
    format!("{:02}:{:02}.{:02}", total / 60, total % 60, centis)
}

pub fn format_size(bytes: u64) -> String {
    const MB: f64 = 1024.0 * 1024.0;
    let b = bytes as f64;
    if b < MB {
        format!("{:.1} KB", b / 1024.0)
    } else {
        format!("{:.1} MB", b / MB)
    }
}

/// Age of a millisecond timestamp relative to `now`, in the coarsest unit
/// that fits.
pub fn format_relative(mtime_ms: i64, now: DateTime<Utc>) -> String {
    let minutes = (now.timestamp_millis() - mtime_ms).max(0) / 60_000;
    let hours = minutes / 60;
    let days = hours / 24;
    if minutes < 1 {
        "just now".to_string()
    } else if minutes < 60 {
        format!("{}m ago", minutes)
    } else if hours < 24 {
        format!("{}h ago", hours)
    } else if days < 7 {
        format!("{}d ago", days)
    } else if days < 30 {
        format!("{}w ago", days / 7)
    } else {
        format!("{}mo ago", days / 30)
    }
}

/// Calendar rendering of a millisecond timestamp in UTC.
pub fn format_timestamp(mtime_ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(mtime_ms)
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}
