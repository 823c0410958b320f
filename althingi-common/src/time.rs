//! Feed timestamp parsing
//!
//! The upstream XML mixes several timestamp renderings, sometimes within a
//! single document: full ISO date-times, date-times without seconds, bare
//! dates, and the older dotted date form. Every extraction goes through one
//! parser with one failure mode.

use crate::{Error, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d.%m.%Y"];

/// Parse a feed timestamp into a UTC date-time.
///
/// The feed carries naive timestamps; they are taken as UTC, matching how
/// they are stored and compared locally. A bare date parses as midnight.
pub fn sensible_datetime(value: &str) -> Result<DateTime<Utc>> {
    let value = value.trim();

    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(dt.and_utc());
        }
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            if let Some(dt) = date.and_hms_opt(0, 0, 0) {
                return Ok(dt.and_utc());
            }
        }
    }

    Err(Error::InvalidInput(format!(
        "Could not figure out datetime format for \"{}\"",
        value
    )))
}

/// Parse a feed date (no time component).
pub fn sensible_date(value: &str) -> Result<NaiveDate> {
    let value = value.trim();

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return Ok(date);
        }
    }

    // Some date fields arrive with a time attached anyway.
    sensible_datetime(value).map(|dt| dt.date_naive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn test_iso_datetime() {
        let dt = sensible_datetime("2018-02-22T17:09:30").unwrap();
        assert_eq!(dt.to_rfc3339(), "2018-02-22T17:09:30+00:00");
    }

    #[test]
    fn test_datetime_without_seconds() {
        let dt = sensible_datetime("2018-02-22 17:09").unwrap();
        assert_eq!(dt.second(), 0);
    }

    #[test]
    fn test_bare_date_is_midnight() {
        let dt = sensible_datetime("2018-02-22").unwrap();
        assert_eq!(dt.to_rfc3339(), "2018-02-22T00:00:00+00:00");
    }

    #[test]
    fn test_dotted_date() {
        let date = sensible_date("22.02.2018").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2018, 2, 22).unwrap());
    }

    #[test]
    fn test_surrounding_whitespace() {
        assert!(sensible_datetime("  2018-02-22T17:09:30\n").is_ok());
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(sensible_datetime("garbage").is_err());
    }

    #[test]
    fn test_invalid_calendar_date_rejected() {
        // Properly formatted but not a real date.
        assert!(sensible_datetime("2017-02-29").is_err());
    }
}
