//! Record timestamp utilities
//!
//! Record names carry their instant as `YEAR.MONTH.DAY.HHMM`, with a 2 or 4
//! digit year. Parsing is best-effort: anything malformed becomes the sentinel
//! oldest instant, so a damaged name always loses duplicate ordering.

use chrono::{Datelike, Local, NaiveDate, NaiveDateTime, Timelike};
use std::fmt;

/// Year of the sentinel oldest instant
pub const SENTINEL_YEAR: i32 = 1900;

/// Comparable instant parsed from a record name
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordInstant(NaiveDateTime);

impl RecordInstant {
    /// The oldest possible instant (1900-01-01 00:00)
    pub fn sentinel() -> Self {
        let dt = NaiveDate::from_ymd_opt(SENTINEL_YEAR, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap_or(NaiveDateTime::MIN);
        Self(dt)
    }

    pub fn from_datetime(dt: NaiveDateTime) -> Self {
        Self(dt)
    }

    /// Parse a `YEAR.MONTH.DAY.HHMM` timestamp, falling back to [`RecordInstant::sentinel`]
    pub fn parse(s: &str) -> Self {
        parse_components(s).map(Self).unwrap_or_else(Self::sentinel)
    }

    pub fn is_sentinel(&self) -> bool {
        *self == Self::sentinel()
    }

    pub fn datetime(&self) -> NaiveDateTime {
        self.0
    }

    pub fn year(&self) -> i32 {
        self.0.year()
    }

    pub fn month(&self) -> u32 {
        self.0.month()
    }

    pub fn day(&self) -> u32 {
        self.0.day()
    }

    pub fn hour(&self) -> u32 {
        self.0.hour()
    }

    pub fn minute(&self) -> u32 {
        self.0.minute()
    }
}

impl fmt::Display for RecordInstant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d %H:%M"))
    }
}

/// Parse a field made only of ASCII digits (no sign, no whitespace)
fn digits<T: std::str::FromStr>(field: &str) -> Option<T> {
    if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    field.parse().ok()
}

fn parse_components(s: &str) -> Option<NaiveDateTime> {
    let parts: Vec<&str> = s.split('.').collect();
    let [year, month, day, time] = parts.as_slice() else {
        return None;
    };

    // Years run 1..=9999; two-digit years are in the 2000s
    if year.len() > 4 {
        return None;
    }
    let year: i32 = digits(year)?;
    let year = if parts[0].len() == 2 { 2000 + year } else { year };
    if year < 1 {
        return None;
    }
    let month: u32 = digits(month)?;
    let day: u32 = digits(day)?;

    let hour_str = if time.len() >= 2 { time.get(..2)? } else { "00" };
    let minute_str = if time.len() >= 4 { time.get(2..4)? } else { "00" };
    let hour: u32 = digits(hour_str)?;
    let minute: u32 = digits(minute_str)?;

    NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, 0)
}

/// Format an instant the way new record names carry it (`YYYY.MM.DD.HHMM`)
pub fn format_record_timestamp(dt: NaiveDateTime) -> String {
    dt.format("%Y.%m.%d.%H%M").to_string()
}

/// Two-digit-year date stamp (`YY.MM.DD`) used to key class summaries
pub fn format_date_stamp(dt: NaiveDateTime) -> String {
    dt.format("%y.%m.%d").to_string()
}

/// Derive a `YY.MM.DD` date stamp from the first three components of a raw
/// record timestamp, without validating the calendar date
pub fn date_stamp_from_timestamp(timestamp: &str) -> Option<String> {
    let parts: Vec<&str> = timestamp.split('.').collect();
    if parts.len() < 3 {
        return None;
    }
    let (yy, mm, dd) = (parts[0], parts[1], parts[2]);
    let yy = if yy.len() == 4 { yy.get(2..)? } else { yy };
    Some(format!("{}.{}.{}", yy, mm, dd))
}

/// Current local wall-clock time
pub fn now() -> NaiveDateTime {
    Local::now().naive_local()
}
