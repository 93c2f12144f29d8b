//! Property-local time display.
//!
//! Properties store a fixed `UTC±HH:MM` offset in their invoice settings;
//! timestamps from the API are shifted by it before display. Named zones
//! (`Africa/Nairobi`) are not resolved and read as UTC.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;

/// Shown in place of a missing or unreadable timestamp
pub const PLACEHOLDER: &str = "—";

lazy_static! {
    static ref UTC_OFFSET: Regex = Regex::new(r"^UTC([+-])(\d{2}):(\d{2})$").expect("valid offset pattern");
    static ref SQL_TIMESTAMP: Regex =
        Regex::new(r"^\d{4}-\d{2}-\d{2}(?:[ T]\d{2}:\d{2}:\d{2})?$").expect("valid timestamp pattern");
}

/// Minutes east of UTC for `UTC±HH:MM`; anything else is 0
pub fn parse_utc_offset(offset: &str) -> i32 {
    let Some(caps) = UTC_OFFSET.captures(offset.trim()) else {
        return 0;
    };
    let sign = if &caps[1] == "-" { -1 } else { 1 };
    let hours: i32 = caps[2].parse().unwrap_or(0);
    let minutes: i32 = caps[3].parse().unwrap_or(0);
    sign * (hours * 60 + minutes)
}

pub fn format_utc_offset(minutes: i32) -> String {
    let sign = if minutes >= 0 { '+' } else { '-' };
    let abs = minutes.unsigned_abs();
    format!("UTC{}{:02}:{:02}", sign, abs / 60, abs % 60)
}

/// Offset for a configured zone: `UTC±HH:MM` offsets only
pub fn zone_offset_minutes(zone: &str) -> i32 {
    if zone.trim().starts_with("UTC") {
        parse_utc_offset(zone)
    } else {
        0
    }
}

/// Parse an API timestamp. SQL-style values without a zone are UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if SQL_TIMESTAMP.is_match(raw) {
        if raw.len() == 10 {
            let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()?;
            return Some(date.and_hms_opt(0, 0, 0)?.and_utc());
        }
        let iso = raw.replacen(' ', "T", 1);
        let naive = NaiveDateTime::parse_from_str(&iso, "%Y-%m-%dT%H:%M:%S").ok()?;
        return Some(naive.and_utc());
    }

    DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.with_timezone(&Utc))
}

/// Date and time as seen at `offset_minutes`
pub fn format_with_offset(value: Option<&str>, offset_minutes: i32) -> String {
    shifted(value, offset_minutes)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| PLACEHOLDER.to_string())
}

/// Calendar date as seen at `offset_minutes`
pub fn format_date_with_offset(value: Option<&str>, offset_minutes: i32) -> String {
    shifted(value, offset_minutes)
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| PLACEHOLDER.to_string())
}

fn shifted(value: Option<&str>, offset_minutes: i32) -> Option<NaiveDateTime> {
    let instant = parse_timestamp(value?)?;
    Some((instant + Duration::minutes(i64::from(offset_minutes))).naive_utc())
}
