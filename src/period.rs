use std::fmt;
use std::sync::LazyLock;

use chrono::{Datelike, NaiveDateTime, Utc};
use regex::Regex;

use crate::date_util::{days_in_month, month_start, naive_to_sql_timestamp, next_month};
use crate::error::{Error, Result};

static RE_MONTH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4})-(\d{1,2})$").unwrap());

/// Earliest year a report can be requested for.
pub const MIN_YEAR: i32 = 1970;
/// Latest year a report can be requested for. Keeps stored timestamps fixed width.
pub const MAX_YEAR: i32 = 9999;

/// A validated calendar month that a report is built for.
///
/// Carries the half-open UTC window `[start, end)` so every aggregation
/// filters on the same bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReportMonth {
    year: i32,
    month: u32,
    days: u32,
    start: NaiveDateTime,
    end: NaiveDateTime,
}

impl ReportMonth {
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
            return Err(Error::InvalidPeriod(format!(
                "year {year} is outside {MIN_YEAR}..={MAX_YEAR}"
            )));
        }
        if !(1..=12).contains(&month) {
            return Err(Error::InvalidPeriod(format!(
                "month {month} is outside 1..=12"
            )));
        }
        let invalid = || Error::InvalidPeriod(format!("{year}-{month:02}"));
        let (next_year, next) = next_month(year, month);
        let start = month_start(year, month).ok_or_else(invalid)?;
        let end = month_start(next_year, next).ok_or_else(invalid)?;
        let days = days_in_month(year, month).ok_or_else(invalid)?;
        Ok(Self {
            year,
            month,
            days,
            start,
            end,
        })
    }

    /// Resolve optional caller input, defaulting missing parts to the current month.
    pub fn resolve(year: Option<i32>, month: Option<u32>) -> Result<Self> {
        let today = Utc::now().date_naive();
        Self::new(year.unwrap_or(today.year()), month.unwrap_or(today.month()))
    }

    /// Parse a `YYYY-MM` month key.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        let caps = RE_MONTH
            .captures(s)
            .ok_or_else(|| Error::InvalidPeriod(format!("unrecognized month: {s}")))?;
        let year: i32 = caps[1]
            .parse()
            .map_err(|_| Error::InvalidPeriod(format!("invalid year: {s}")))?;
        let month: u32 = caps[2]
            .parse()
            .map_err(|_| Error::InvalidPeriod(format!("invalid month: {s}")))?;
        Self::new(year, month)
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn days_in_month(&self) -> u32 {
        self.days
    }

    /// Half-open window `[start, end)` formatted for SQL comparison.
    pub fn sql_bounds(&self) -> (String, String) {
        (
            naive_to_sql_timestamp(&self.start),
            naive_to_sql_timestamp(&self.end),
        )
    }

    pub fn to_key(&self) -> String {
        format!("{}-{:02}", self.year, self.month)
    }
}

impl fmt::Display for ReportMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_key())
    }
}
