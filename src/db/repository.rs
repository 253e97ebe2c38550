//! Database repository for CRUD operations.
//!
//! The operations for each collection live in their own file as further
//! `impl Repository` blocks; this file holds the handle and row helpers.

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::SqlitePool;

/// Database repository for all data operations.
#[derive(Clone)]
pub struct Repository {
    pub(super) pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

/// Format a timestamp for storage. Fixed-width UTC so text comparison orders correctly.
pub fn timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub(super) fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|e| {
            tracing::warn!("Unparseable stored timestamp {:?}: {}", s, e);
            DateTime::<Utc>::default()
        })
}

pub(super) fn parse_optional_timestamp(s: Option<String>) -> Option<DateTime<Utc>> {
    s.as_deref().map(parse_timestamp)
}

pub(super) fn parse_json_array(s: Option<String>) -> Vec<String> {
    s.and_then(|s| serde_json::from_str(&s).ok())
        .unwrap_or_default()
}

pub(super) fn to_json_array(values: &[String]) -> String {
    serde_json::to_string(values).unwrap_or_else(|_| "[]".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_timestamp_round_trip_and_ordering() {
        let earlier = Utc.with_ymd_and_hms(2026, 9, 30, 23, 59, 59).unwrap();
        let later = Utc.with_ymd_and_hms(2026, 10, 1, 0, 0, 0).unwrap();

        assert_eq!(timestamp(&earlier), "2026-09-30T23:59:59.000Z");
        assert!(timestamp(&earlier) < timestamp(&later));
        assert_eq!(parse_timestamp(&timestamp(&later)), later);
    }

    #[test]
    fn test_json_array_helpers() {
        let photos = vec!["/uploads/2026/10/a.jpg".to_string()];
        assert_eq!(parse_json_array(Some(to_json_array(&photos))), photos);
        assert!(parse_json_array(None).is_empty());
        assert!(parse_json_array(Some("not json".to_string())).is_empty());
    }
}
