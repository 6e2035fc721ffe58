//! Time crate type implementations (Date, Time, PrimitiveDateTime, OffsetDateTime).

use time::format_description::BorrowedFormatItem;
use time::macros::format_description;

use crate::error::{Error, Result};
use crate::types::SqlValue;

use super::{FromValue, as_text, downcast, mismatch};

const DATE: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");
const TIME: &[BorrowedFormatItem<'static>] =
    format_description!("[hour]:[minute]:[second][optional [.[subsecond]]]");
const TIMESTAMP: &[BorrowedFormatItem<'static>] = format_description!(
    "[year]-[month]-[day] [hour]:[minute]:[second][optional [.[subsecond]]]"
);
const TIMESTAMPTZ: &[BorrowedFormatItem<'static>] = format_description!(
    "[year]-[month]-[day] [hour]:[minute]:[second][optional [.[subsecond]]][offset_hour][optional [:[offset_minute]]]"
);

/// Exact type, or parse it from text.
fn from_value_or_text<T: Clone + 'static>(
    value: &dyn SqlValue,
    what: &str,
    parse: impl FnOnce(&str) -> core::result::Result<T, time::error::Parse>,
) -> Result<T> {
    if let Some(v) = downcast::<T>(value) {
        return Ok(v);
    }
    if let Some(s) = as_text(value) {
        return parse(s).map_err(|e| Error::Decode(format!("invalid {}: {}", what, e)));
    }
    Err(mismatch::<T>(value))
}

impl FromValue for time::Date {
    fn from_value(value: &dyn SqlValue) -> Result<Self> {
        from_value_or_text(value, "date", |s| time::Date::parse(s, DATE))
    }
}

impl FromValue for time::Time {
    fn from_value(value: &dyn SqlValue) -> Result<Self> {
        from_value_or_text(value, "time", |s| time::Time::parse(s, TIME))
    }
}

impl FromValue for time::PrimitiveDateTime {
    fn from_value(value: &dyn SqlValue) -> Result<Self> {
        from_value_or_text(value, "timestamp", |s| {
            time::PrimitiveDateTime::parse(s, TIMESTAMP)
        })
    }
}

impl FromValue for time::OffsetDateTime {
    fn from_value(value: &dyn SqlValue) -> Result<Self> {
        if let Some(v) = downcast::<time::PrimitiveDateTime>(value) {
            return Ok(v.assume_utc());
        }
        from_value_or_text(value, "timestamptz", |s| {
            time::OffsetDateTime::parse(s, TIMESTAMPTZ)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime};

    #[test]
    fn test_date_text() {
        assert_eq!(time::Date::from_value(&"2024-01-15").unwrap(), date!(2024 - 01 - 15));
    }

    #[test]
    fn test_timestamp_text() {
        let ts = time::PrimitiveDateTime::from_value(&"2024-01-15 10:30:00").unwrap();
        assert_eq!(ts, datetime!(2024-01-15 10:30:00));
    }

    #[test]
    fn test_timestamptz_text() {
        let ts = time::OffsetDateTime::from_value(&"2024-01-15 10:30:00+02").unwrap();
        assert_eq!(ts, datetime!(2024-01-15 08:30:00 UTC));
    }

    #[test]
    fn test_exact_value() {
        let d = date!(2000 - 01 - 01);
        assert_eq!(time::Date::from_value(&d).unwrap(), d);
        assert!(time::Date::from_value(&1_i32).is_err());
    }
}
