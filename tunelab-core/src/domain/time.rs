//! Timestamp coercion and rendering.
//!
//! Store columns hold epoch milliseconds, but older rows were written as
//! text or floats. Everything is coerced to `i64` epoch ms before joining.

use chrono::{DateTime, NaiveDateTime};

pub const MS_PER_MINUTE: i64 = 60_000;
pub const MS_PER_HOUR: i64 = 60 * MS_PER_MINUTE;

/// Coerce a floating-point column value to epoch ms.
pub fn coerce_real_millis(value: f64) -> Option<i64> {
    if value.is_finite() {
        Some(value as i64)
    } else {
        None
    }
}

/// Coerce a text column value to epoch ms.
///
/// Accepts integer and decimal strings (already epoch ms), RFC 3339 strings,
/// and naive `YYYY-MM-DD HH:MM:SS` / `YYYY-MM-DDTHH:MM:SS` strings (read as UTC).
pub fn coerce_text_millis(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(ms) = raw.parse::<i64>() {
        return Some(ms);
    }
    if let Ok(ms) = raw.parse::<f64>() {
        return coerce_real_millis(ms);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.timestamp_millis());
    }
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|dt| dt.and_utc().timestamp_millis())
}

/// Render epoch ms as an ISO 8601 UTC string with millisecond precision.
pub fn iso_utc(ms: i64) -> String {
    match DateTime::from_timestamp_millis(ms) {
        Some(dt) => dt.naive_utc().format("%Y-%m-%dT%H:%M:%S%.3f").to_string(),
        None => String::new(),
    }
}
