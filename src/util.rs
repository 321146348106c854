//! Shared utility functions used across the codebase.

use chrono::{DateTime, Local, NaiveTime, TimeZone, Utc};

/// Parse an environment variable as a boolean, returning `default` if unset.
///
/// Recognises `1`, `true`, `yes`, `y`, `on` (case-insensitive) as `true`;
/// everything else maps to `false`. An unset variable maps to `default`.
pub fn env_var_bool(name: &str, default: bool) -> bool {
    match std::env::var(name) {
        Ok(value) => matches!(
            value.trim().to_lowercase().as_str(),
            "1" | "true" | "yes" | "y" | "on"
        ),
        Err(_) => default,
    }
}

/// Current time as unix epoch milliseconds.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Today's local date as `YYYY-MM-DD`.
pub fn today_string() -> String {
    Local::now().format("%Y-%m-%d").to_string()
}

/// Local date (`YYYY-MM-DD`) of an epoch-millis timestamp.
pub fn local_date_of(millis: i64) -> Option<String> {
    local_datetime(millis).map(|dt| dt.format("%Y-%m-%d").to_string())
}

/// Local wall-clock time of an epoch-millis timestamp.
pub fn local_time_of(millis: i64) -> Option<NaiveTime> {
    local_datetime(millis).map(|dt| dt.time())
}

fn local_datetime(millis: i64) -> Option<DateTime<Local>> {
    Local.timestamp_millis_opt(millis).single()
}

/// Parse an `HH:MM` clock value.
pub fn parse_clock(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M").ok()
}

/// Split a comma-separated list, trimming and dropping empty entries.
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}
