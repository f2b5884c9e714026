//! Presentation helpers: relative timestamps, recency and source tags.
//!
//! Every function takes `now` explicitly so results are deterministic.

use chrono::{DateTime, Duration, NaiveDateTime, Utc};

/// Content published within this window counts as new.
pub const NEW_CONTENT_WINDOW: Duration = Duration::hours(24);

/// Tag used when content has no source name.
pub const DEFAULT_TAG: &str = "#KeyFeed";

/// Label for timestamps under a minute old, missing or unparseable.
pub const JUST_NOW: &str = "just now";

/// Parse a backend timestamp.
///
/// Accepts RFC 3339 and zone-less `YYYY-MM-DDTHH:MM:SS[.fff]`, which is
/// taken as UTC.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Relative label such as `5m ago`, `3h ago` or `2d ago`.
///
/// Future timestamps and anything a week or older use `YYYY.MM.DD`.
pub fn relative_time(at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(at) = at else {
        return JUST_NOW.to_string();
    };
    let diff = now.signed_duration_since(at);
    if diff < Duration::zero() || diff >= Duration::days(7) {
        return absolute_date(at);
    }
    if diff < Duration::minutes(1) {
        JUST_NOW.to_string()
    } else if diff < Duration::hours(1) {
        format!("{}m ago", diff.num_minutes())
    } else if diff < Duration::days(1) {
        format!("{}h ago", diff.num_hours())
    } else {
        format!("{}d ago", diff.num_days())
    }
}

/// `YYYY.MM.DD`.
pub fn absolute_date(at: DateTime<Utc>) -> String {
    at.format("%Y.%m.%d").to_string()
}

/// Whether `at` lies within [`NEW_CONTENT_WINDOW`] before `now`.
pub fn is_recent(at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    match at {
        Some(at) => {
            let diff = now.signed_duration_since(at);
            diff >= Duration::zero() && diff <= NEW_CONTENT_WINDOW
        }
        None => false,
    }
}

/// `#SourceName` with whitespace removed, or [`DEFAULT_TAG`].
pub fn source_tag(source: &str) -> String {
    let compact: String = source.split_whitespace().collect();
    if compact.is_empty() {
        DEFAULT_TAG.to_string()
    } else {
        format!("#{}", compact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 17, 12, 0, 0).unwrap()
    }

    #[test]
    fn parses_rfc3339_and_naive() {
        let a = parse_timestamp("2026-10-17T11:00:00Z").unwrap();
        let b = parse_timestamp("2026-10-17T20:00:00+09:00").unwrap();
        let c = parse_timestamp("2026-10-17T11:00:00.123").unwrap();
        assert_eq!(a, b);
        assert_eq!(c.timestamp(), a.timestamp());
        assert!(parse_timestamp("yesterday").is_none());
        assert!(parse_timestamp("  ").is_none());
    }

    #[test]
    fn relative_buckets() {
        let n = now();
        assert_eq!(relative_time(Some(n - Duration::seconds(30)), n), JUST_NOW);
        assert_eq!(relative_time(Some(n - Duration::minutes(5)), n), "5m ago");
        assert_eq!(relative_time(Some(n - Duration::minutes(150)), n), "2h ago");
        assert_eq!(relative_time(Some(n - Duration::days(3)), n), "3d ago");
        assert_eq!(relative_time(Some(n - Duration::days(8)), n), "2026.10.09");
    }

    #[test]
    fn future_and_missing_timestamps() {
        let n = now();
        assert_eq!(relative_time(Some(n + Duration::hours(1)), n), "2026.10.17");
        assert_eq!(relative_time(None, n), JUST_NOW);
    }

    #[test]
    fn recency_window() {
        let n = now();
        assert!(is_recent(Some(n - Duration::hours(23)), n));
        assert!(is_recent(Some(n - Duration::hours(24)), n));
        assert!(!is_recent(Some(n - Duration::hours(25)), n));
        assert!(!is_recent(Some(n + Duration::minutes(1)), n));
        assert!(!is_recent(None, n));
    }

    #[test]
    fn tags_strip_whitespace() {
        assert_eq!(source_tag("Tech Daily  News"), "#TechDailyNews");
        assert_eq!(source_tag("   "), DEFAULT_TAG);
        assert_eq!(source_tag(""), DEFAULT_TAG);
    }
}
