// src/utils/time.rs

//! Timestamp parsing for the date formats blog platforms emit.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Parse a platform timestamp into unix seconds.
///
/// Accepts RFC 3339, RFC 2822 and the zone-less forms WordPress uses for
/// `*_gmt` fields, which are taken as UTC.
pub fn parse_timestamp(value: &str) -> Option<i64> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.timestamp());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(value) {
        return Some(dt.timestamp());
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Some(dt.and_utc().timestamp());
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().timestamp())
}

/// Current unix time in seconds.
pub fn now() -> i64 {
    Utc::now().timestamp()
}

/// RFC 3339 rendering of unix seconds.
pub fn to_rfc3339(ts: i64) -> Option<String> {
    DateTime::<Utc>::from_timestamp(ts, 0).map(|dt| dt.to_rfc3339())
}
