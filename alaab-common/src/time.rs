//! Timestamp utilities
//!
//! Timestamps are stored as RFC 3339 text with microsecond precision and a
//! `Z` suffix, so that lexical order in SQL equals chronological order.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::{Error, Result};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Format a timestamp for storage
pub fn to_db(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Current time formatted for storage
pub fn now_db() -> String {
    to_db(&now())
}

/// Parse a stored timestamp
pub fn from_db(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Internal(format!("Invalid timestamp '{}': {}", value, e)))
}

/// Parse an optional stored timestamp
pub fn from_db_opt(value: Option<String>) -> Result<Option<DateTime<Utc>>> {
    value.as_deref().map(from_db).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_now_returns_valid_timestamp() {
        let timestamp = now();
        // Should be a reasonable timestamp (after year 2000)
        assert!(timestamp.timestamp() > 946_684_800);
    }

    #[test]
    fn test_db_format_uses_micros_and_z_suffix() {
        let ts = Utc.with_ymd_and_hms(2025, 3, 1, 12, 30, 5).unwrap();
        assert_eq!(to_db(&ts), "2025-03-01T12:30:05.000000Z");
    }

    #[test]
    fn test_db_format_parses_back() {
        let ts = now();
        let parsed = from_db(&to_db(&ts)).unwrap();
        assert_eq!(parsed.timestamp_micros(), ts.timestamp_micros());
    }

    #[test]
    fn test_db_format_sorts_lexically() {
        let earlier = Utc.with_ymd_and_hms(2025, 1, 9, 23, 59, 59).unwrap();
        let later = Utc.with_ymd_and_hms(2025, 1, 10, 0, 0, 0).unwrap();
        assert!(to_db(&earlier) < to_db(&later));
    }

    #[test]
    fn test_invalid_timestamp_is_error() {
        assert!(from_db("yesterday").is_err());
        assert!(from_db_opt(None).unwrap().is_none());
    }
}
