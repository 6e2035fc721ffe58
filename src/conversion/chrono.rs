//! Chrono crate type implementations (NaiveDate, NaiveTime, NaiveDateTime, DateTime<Utc>).

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};

use crate::error::{Error, Result};
use crate::types::SqlValue;

use super::{FromValue, as_text, downcast, mismatch};

impl FromValue for NaiveDate {
    fn from_value(value: &dyn SqlValue) -> Result<Self> {
        if let Some(v) = downcast::<NaiveDate>(value) {
            return Ok(v);
        }
        if let Some(s) = as_text(value) {
            return NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .map_err(|e| Error::Decode(format!("invalid date: {}", e)));
        }
        Err(mismatch::<NaiveDate>(value))
    }
}

impl FromValue for NaiveTime {
    fn from_value(value: &dyn SqlValue) -> Result<Self> {
        if let Some(v) = downcast::<NaiveTime>(value) {
            return Ok(v);
        }
        if let Some(s) = as_text(value) {
            return NaiveTime::parse_from_str(s, "%H:%M:%S%.f")
                .map_err(|e| Error::Decode(format!("invalid time: {}", e)));
        }
        Err(mismatch::<NaiveTime>(value))
    }
}

impl FromValue for NaiveDateTime {
    fn from_value(value: &dyn SqlValue) -> Result<Self> {
        if let Some(v) = downcast::<NaiveDateTime>(value) {
            return Ok(v);
        }
        if let Some(s) = as_text(value) {
            return NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
                .map_err(|e| Error::Decode(format!("invalid timestamp: {}", e)));
        }
        Err(mismatch::<NaiveDateTime>(value))
    }
}

impl FromValue for DateTime<Utc> {
    fn from_value(value: &dyn SqlValue) -> Result<Self> {
        if let Some(v) = downcast::<DateTime<Utc>>(value) {
            return Ok(v);
        }
        if let Some(v) = downcast::<NaiveDateTime>(value) {
            return Ok(v.and_utc());
        }
        if let Some(s) = as_text(value) {
            // PostgreSQL renders TIMESTAMPTZ like "2024-01-15 10:30:00+00"
            for fmt in ["%Y-%m-%d %H:%M:%S%.f%#z", "%Y-%m-%dT%H:%M:%S%.f%#z"] {
                if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
                    return Ok(dt.with_timezone(&Utc));
                }
            }
            return Err(Error::Decode(format!("invalid timestamptz: {}", s)));
        }
        Err(mismatch::<DateTime<Utc>>(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_date_text() {
        let date = NaiveDate::from_value(&"2024-01-15").unwrap();
        assert_eq!((date.year(), date.month(), date.day()), (2024, 1, 15));
    }

    #[test]
    fn test_timestamp_text() {
        let ts = NaiveDateTime::from_value(&"2024-01-15 10:30:00.5").unwrap();
        assert_eq!(ts.hour(), 10);
        assert_eq!(ts.nanosecond(), 500_000_000);
    }

    #[test]
    fn test_timestamptz_text() {
        let ts = DateTime::<Utc>::from_value(&"2024-01-15 10:30:00+02").unwrap();
        assert_eq!(ts.hour(), 8);
    }

    #[test]
    fn test_timestamptz_from_naive() {
        let naive = NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(1, 2, 3)
            .unwrap();
        assert_eq!(DateTime::<Utc>::from_value(&naive).unwrap(), naive.and_utc());
    }
}
