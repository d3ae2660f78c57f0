//! Timestamp utilities
//!
//! Timestamps are stored as RFC 3339 text with a fixed `Z` suffix and
//! microsecond precision so that lexicographic order matches time order.

use crate::{Error, Result};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};

/// Format a timestamp for storage
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a stored timestamp
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::InvalidInput(format!("Invalid timestamp '{}': {}", s, e)))
}

/// Parse a stored `YYYY-MM-DD` date
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| Error::InvalidInput(format!("Invalid date '{}': {}", s, e)))
}

/// Midnight UTC at the start of `date`
pub fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_hms_opt(0, 0, 0)
        .unwrap_or_default()
        .and_utc()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_timestamp_format_is_sortable() {
        let earlier = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        let later = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();

        let a = format_timestamp(&earlier);
        let b = format_timestamp(&later);
        assert_eq!(a, "2024-03-01T09:00:00.000000Z");
        assert!(a < b);
    }

    #[test]
    fn test_parse_timestamp_accepts_offsets() {
        let parsed = parse_timestamp("2024-03-01T16:00:00+07:00").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap());
        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn test_start_of_day() {
        let date = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        assert_eq!(
            format_timestamp(&start_of_day(date)),
            "2024-02-29T00:00:00.000000Z"
        );
        assert_eq!(parse_date("2024-02-29").unwrap(), date);
        assert!(parse_date("2024-02-30").is_err());
    }
}
