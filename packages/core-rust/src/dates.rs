//! Canonical `YYYY-MM-DD` handling for date-valued fields.
//!
//! The backend sends dates in several shapes depending on the entity's Java
//! type: plain ISO dates, ISO date-times with or without an offset, Jackson's
//! `[y, m, d, ...]` arrays, or epoch milliseconds. Edit state only ever holds
//! the canonical text form.
//!
//! Date-times are truncated to the calendar date written in the timestamp.
//! No time-zone conversion happens, so `2024-03-05T23:30:00-03:00` is
//! `2024-03-05` even though it is already March 6th in UTC.
//!
//! Epoch milliseconds carry no written date and are read as UTC. A backend
//! that serializes local midnight east of UTC this way shows up one day
//! early; such backends should send ISO text instead.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;

/// `strftime` pattern of the canonical form.
pub const CANONICAL_FORMAT: &str = "%Y-%m-%d";

/// Formats a date in canonical form.
#[must_use]
pub fn format_date(date: NaiveDate) -> String {
    date.format(CANONICAL_FORMAT).to_string()
}

/// Today's date in the local time zone, in canonical form.
#[must_use]
pub fn today() -> String {
    format_date(Local::now().date_naive())
}

/// Parses user input that must already be in canonical form.
#[must_use]
pub fn parse_canonical(input: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), CANONICAL_FORMAT).ok()
}

/// Reads a date from any of the shapes the backend is known to send.
///
/// Numbers are epoch milliseconds and resolve to their UTC date.
#[must_use]
pub fn parse_date(value: &Value) -> Option<NaiveDate> {
    match value {
        Value::String(s) => parse_date_text(s),
        Value::Array(parts) => parse_date_parts(parts),
        Value::Number(n) => n
            .as_i64()
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .map(|dt| dt.date_naive()),
        _ => None,
    }
}

/// Canonical text form of a backend date value, or `None` if it is not a date.
#[must_use]
pub fn canonicalize(value: &Value) -> Option<String> {
    parse_date(value).map(format_date)
}

fn parse_date_text(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if let Some(date) = parse_canonical(text) {
        return Some(date);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(dt.date());
    }
    // Offsets without a colon (`+0000`) and other date-time tails.
    match text.get(10..).and_then(|tail| tail.chars().next()) {
        Some('T' | ' ') => text.get(..10).and_then(parse_canonical),
        _ => None,
    }
}

fn parse_date_parts(parts: &[Value]) -> Option<NaiveDate> {
    let year = parts.first()?.as_i64()?;
    let month = parts.get(1)?.as_u64()?;
    let day = parts.get(2)?.as_u64()?;
    NaiveDate::from_ymd_opt(
        i32::try_from(year).ok()?,
        u32::try_from(month).ok()?,
        u32::try_from(day).ok()?,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn canonical_text_passes_through() {
        assert_eq!(canonicalize(&json!("2024-03-05")).as_deref(), Some("2024-03-05"));
    }

    #[test]
    fn datetime_is_truncated_without_zone_shift() {
        assert_eq!(
            canonicalize(&json!("2024-03-05T23:30:00-03:00")).as_deref(),
            Some("2024-03-05")
        );
        assert_eq!(
            canonicalize(&json!("2024-03-05T01:00:00+09:00")).as_deref(),
            Some("2024-03-05")
        );
        assert_eq!(
            canonicalize(&json!("2024-03-05T00:00:00.000Z")).as_deref(),
            Some("2024-03-05")
        );
    }

    #[test]
    fn naive_datetime_and_compact_offset() {
        assert_eq!(
            canonicalize(&json!("2024-03-05T10:15:30.123")).as_deref(),
            Some("2024-03-05")
        );
        assert_eq!(
            canonicalize(&json!("2024-03-05T10:15:30.000+0000")).as_deref(),
            Some("2024-03-05")
        );
        assert_eq!(
            canonicalize(&json!("2024-03-05 10:15:30")).as_deref(),
            Some("2024-03-05")
        );
    }

    #[test]
    fn jackson_array_form() {
        assert_eq!(canonicalize(&json!([2023, 12, 31])).as_deref(), Some("2023-12-31"));
        assert_eq!(
            canonicalize(&json!([2023, 12, 31, 18, 45, 0])).as_deref(),
            Some("2023-12-31")
        );
        assert_eq!(canonicalize(&json!([2023, 13, 1])), None);
    }

    #[test]
    fn epoch_millis_form() {
        // 2024-01-02T00:00:00Z
        assert_eq!(canonicalize(&json!(1_704_153_600_000_i64)).as_deref(), Some("2024-01-02"));
        // 2024-01-02T00:00:00+03:00 is still January 1st in UTC.
        assert_eq!(canonicalize(&json!(1_704_142_800_000_i64)).as_deref(), Some("2024-01-01"));
    }

    #[test]
    fn non_dates_are_rejected() {
        assert_eq!(canonicalize(&json!("")), None);
        assert_eq!(canonicalize(&json!("not a date")), None);
        assert_eq!(canonicalize(&json!("2024-03-05garbage")), None);
        assert_eq!(canonicalize(&json!("2024-03-050")), None);
        assert_eq!(canonicalize(&json!(null)), None);
        assert_eq!(canonicalize(&json!(true)), None);
    }

    #[test]
    fn parse_canonical_is_strict() {
        assert!(parse_canonical("2024-02-29").is_some());
        assert!(parse_canonical("2023-02-29").is_none());
        assert!(parse_canonical("05/03/2024").is_none());
    }

    #[test]
    fn today_is_canonical() {
        let today = today();
        assert_eq!(today.len(), 10);
        assert!(parse_canonical(&today).is_some());
    }

    proptest! {
        #[test]
        fn offset_never_changes_calendar_date(
            days in 0i64..60_000,
            secs in 0u32..86_400,
            offset_minutes in -720i32..=840,
        ) {
            let date = NaiveDate::from_ymd_opt(1900, 1, 1).unwrap() + chrono::Duration::days(days);
            let sign = if offset_minutes < 0 { '-' } else { '+' };
            let abs = offset_minutes.abs();
            let stamp = format!(
                "{}T{:02}:{:02}:{:02}{}{:02}:{:02}",
                format_date(date),
                secs / 3600,
                (secs / 60) % 60,
                secs % 60,
                sign,
                abs / 60,
                abs % 60,
            );
            let canonical = canonicalize(&Value::String(stamp)).unwrap();
            prop_assert_eq!(&canonical, &format_date(date));
            // Sending the canonical form back and re-reading it is stable.
            prop_assert_eq!(canonicalize(&Value::String(canonical.clone())), Some(canonical));
        }
    }
}
