//! Time parsing utilities for scheduler output.

use chrono::{DateTime, Datelike, NaiveDateTime, TimeZone, Utc};

/// Parse an ISO-like timestamp (`YYYY-MM-DDTHH:MM:SS`) as emitted by
/// `squeue` and Grid Engine's XML feeds.
///
/// Returns None for empty strings or placeholder values like "N/A".
pub fn parse_iso_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if s.is_empty() || s == "N/A" || s == "Unknown" || s == "None" {
        return None;
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
        .ok()
        .and_then(|dt| Utc.from_local_datetime(&dt).single())
}

/// Parse an integer epoch-seconds timestamp.
pub fn parse_epoch_timestamp(s: &str) -> Option<DateTime<Utc>> {
    s.trim()
        .parse::<i64>()
        .ok()
        .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
}

/// Parse a year-less `MM/DD-HH:MM:SS` timestamp, as `bjobs -W` prints.
///
/// The year is taken from `now`; when the parsed month is numerically after
/// the current month the time is assumed to belong to the previous year
/// (a job that started before a year boundary). Only meaningful for times
/// in the past; an estimated future finish time would roll back wrongly.
pub fn parse_past_time(s: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    if s.is_empty() || s == "-" {
        return None;
    }

    let with_year = |year: i32| {
        NaiveDateTime::parse_from_str(&format!("{year}/{s}"), "%Y/%m/%d-%H:%M:%S")
            .ok()
            .and_then(|dt| Utc.from_local_datetime(&dt).single())
    };

    let parsed = with_year(now.year())?;
    if parsed.month() > now.month() {
        with_year(now.year() - 1)
    } else {
        Some(parsed)
    }
}

/// Parse a duration in `D-HH:MM:SS`, `HH:MM:SS`, `MM:SS`, or plain-seconds
/// form into seconds.
///
/// Returns None for "UNLIMITED", placeholder, or empty values.
pub fn parse_duration_secs(s: &str) -> Option<u64> {
    if s.is_empty() || s == "UNLIMITED" || s == "-" || s == "N/A" {
        return None;
    }

    let parts: Vec<&str> = s.split('-').collect();
    let (days, time_part) = if parts.len() == 2 {
        (parts[0].parse::<u64>().unwrap_or(0), parts[1])
    } else {
        (0, parts[0])
    };

    let time_parts: Vec<u64> = time_part
        .split(':')
        .map(|p| p.parse().ok())
        .collect::<Option<Vec<u64>>>()?;

    let seconds = match time_parts.len() {
        3 => time_parts[0] * 3600 + time_parts[1] * 60 + time_parts[2],
        2 => time_parts[0] * 60 + time_parts[1],
        1 => time_parts[0],
        _ => return None,
    };

    Some(days * 86400 + seconds)
}

/// Format seconds as the `HH:MM:SS` duration the submission CLIs accept for
/// run-time limits.
pub fn seconds_to_duration(seconds: u64) -> String {
    format!(
        "{:02}:{:02}:{:02}",
        seconds / 3600,
        seconds / 60 % 60,
        seconds % 60
    )
}
