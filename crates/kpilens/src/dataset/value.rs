//! Cell values and the text parsers used by schema inference.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Serialize;

/// Text that stands for "no value" in source files.
pub const MISSING_MARKERS: [&str; 8] = ["", "NA", "N/A", "NaN", "nan", "null", "NULL", "None"];

const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];
const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y"];

/// A single cell of a [`Dataset`](crate::Dataset).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Number(f64),
    Text(String),
    Time(NaiveDateTime),
    Missing,
}

impl Value {
    #[must_use]
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }

    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(v) => write!(f, "{v}"),
            Self::Text(s) => f.write_str(s),
            Self::Time(t) => write!(f, "{t}"),
            Self::Missing => Ok(()),
        }
    }
}

#[must_use]
pub fn is_missing_text(s: &str) -> bool {
    let s = s.trim();
    MISSING_MARKERS.contains(&s)
}

/// Parse a numeric cell. `Ok(None)` is a missing value, `Err(())` is text that
/// is not a number.
pub fn parse_number(s: &str) -> Result<Option<f64>, ()> {
    if is_missing_text(s) {
        return Ok(None);
    }
    let v: f64 = s.trim().parse().map_err(|_| ())?;
    // inf and NaN spellings parse, but never carry a measurement
    Ok(v.is_finite().then_some(v))
}

/// Parse a date or date-time cell. `Ok(None)` is a missing value.
pub fn parse_datetime(s: &str) -> Result<Option<NaiveDateTime>, ()> {
    if is_missing_text(s) {
        return Ok(None);
    }
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(Some(dt.naive_utc()));
    }
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(Some(dt));
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, format) {
            return Ok(date.and_hms_opt(0, 0, 0));
        }
    }
    Err(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_and_missing_markers() {
        assert_eq!(parse_number(" 42.5 "), Ok(Some(42.5)));
        assert_eq!(parse_number("-3"), Ok(Some(-3.0)));
        assert_eq!(parse_number(""), Ok(None));
        assert_eq!(parse_number("NaN"), Ok(None));
        assert_eq!(parse_number("N/A"), Ok(None));
        assert_eq!(parse_number("inf"), Ok(None));
        assert_eq!(parse_number("abc"), Err(()));
    }

    #[test]
    fn datetime_formats() {
        let midnight = NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(parse_datetime("2024-03-09"), Ok(Some(midnight)));
        assert_eq!(parse_datetime("2024/03/09"), Ok(Some(midnight)));
        assert_eq!(parse_datetime("09/03/2024"), Ok(Some(midnight)));
        assert_eq!(parse_datetime("2024-03-09T00:00:00Z"), Ok(Some(midnight)));
        assert_eq!(parse_datetime("2024-03-09 00:00:00"), Ok(Some(midnight)));
        assert_eq!(parse_datetime("null"), Ok(None));
        assert_eq!(parse_datetime("March"), Err(()));
    }
}
