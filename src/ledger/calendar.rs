use std::fmt;

use chrono::{Datelike, Duration, NaiveDate};

use crate::errors::{EngineError, Result};

/// Pure calendar helpers. Dates are plain `NaiveDate` calendar days; the
/// engine never constructs timestamp values, so interval boundaries cannot
/// shift with timezones or DST.

pub fn last_day_of_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month >= 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .map(|first_of_next| (first_of_next - Duration::days(1)).day())
        .unwrap_or(28)
}

pub fn clamp_day(year: i32, month: u32, day: u32) -> u32 {
    day.min(last_day_of_month(year, month))
}

pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Month arithmetic with the day clamped to the target month, so the day is
/// never carried over into the following month (Jan 31 + 1 month is Feb 28
/// or 29, never Mar 3).
pub fn add_months(date: NaiveDate, months: i32) -> NaiveDate {
    let mut year = date.year();
    let mut month = date.month() as i32 + months;
    while month > 12 {
        month -= 12;
        year += 1;
    }
    while month < 1 {
        month += 12;
        year -= 1;
    }
    let month = month as u32;
    let day = clamp_day(year, month, date.day());
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or(date)
}

pub fn to_iso_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Parses a canonical `YYYY-MM-DD` calendar date. The shape is checked
/// before chrono gets involved so sloppy inputs ("2024-1-5", timestamps)
/// are rejected rather than coerced.
pub fn from_iso_date(value: &str) -> Result<NaiveDate> {
    if !looks_like_iso_date(value) {
        return Err(EngineError::InvalidDate(value.to_string()));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| EngineError::InvalidDate(value.to_string()))
}

fn looks_like_iso_date(value: &str) -> bool {
    if value.len() != 10 {
        return false;
    }
    let bytes = value.as_bytes();
    if bytes[4] != b'-' || bytes[7] != b'-' {
        return false;
    }
    for index in [0usize, 1, 2, 3, 5, 6, 8, 9] {
        if !bytes[index].is_ascii_digit() {
            return false;
        }
    }
    true
}

/// Ordered calendar-month key used for candidate iteration and the
/// by-month grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn next(self) -> Self {
        if self.month >= 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    pub fn first_day(self) -> NaiveDate {
        self.day_clamped(1)
    }

    /// Builds the date for `day` within this month, clamped to the month's
    /// last day.
    pub fn day_clamped(self, day: u32) -> NaiveDate {
        let day = clamp_day(self.year, self.month, day.max(1));
        NaiveDate::from_ymd_opt(self.year, self.month, day)
            .unwrap_or_else(|| NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap())
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}
