//! Calendar periods used as time-series keys.
//!
//! A [`Period`] is either a month (`YYYY-MM`) or a year (`YYYY`). Periods of
//! the same granularity are totally ordered and can be stepped forward one
//! unit at a time, which is all the densifier needs.

use crate::error::{LandscapeError, OptionExt, Result};
use chrono::{DateTime, Datelike, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// Month or year granularity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Granularity {
    Month,
    Year,
}

/// A calendar month or calendar year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Period {
    Year(i32),
    Month { year: i32, month: u32 },
}

fn period_regex() -> Result<&'static Regex> {
    static PERIOD_RE: OnceLock<Regex> = OnceLock::new();
    if let Some(re) = PERIOD_RE.get() {
        return Ok(re);
    }
    let re = Regex::new(r"^(\d{4})(?:-(\d{2}))?$").map_err(|e| LandscapeError::Parse(e.to_string()))?;
    Ok(PERIOD_RE.get_or_init(|| re))
}

impl Period {
    /// Build a month period, validating the month number.
    pub fn month(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(LandscapeError::Parse(format!(
                "Month out of range in {}-{:02}",
                year, month
            )));
        }
        Ok(Period::Month { year, month })
    }

    /// Month containing the given instant.
    pub fn month_of(at: &DateTime<Utc>) -> Self {
        Period::Month {
            year: at.year(),
            month: at.month(),
        }
    }

    pub fn granularity(&self) -> Granularity {
        match self {
            Period::Month { .. } => Granularity::Month,
            Period::Year(_) => Granularity::Year,
        }
    }

    /// Calendar year this period falls in.
    pub fn calendar_year(&self) -> i32 {
        match *self {
            Period::Month { year, .. } => year,
            Period::Year(year) => year,
        }
    }

    /// The enclosing year period (a year is its own enclosing year).
    pub fn to_year(&self) -> Self {
        Period::Year(self.calendar_year())
    }

    /// First month of this period (a month is its own first month).
    pub fn first_month(&self) -> Self {
        match *self {
            Period::Year(year) => Period::Month { year, month: 1 },
            month => month,
        }
    }

    /// Next period at the same granularity.
    pub fn succ(&self) -> Self {
        match *self {
            Period::Month { year, month: 12 } => Period::Month {
                year: year + 1,
                month: 1,
            },
            Period::Month { year, month } => Period::Month {
                year,
                month: month + 1,
            },
            Period::Year(year) => Period::Year(year + 1),
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Period::Month { year, month } => write!(f, "{:04}-{:02}", year, month),
            Period::Year(year) => write!(f, "{:04}", year),
        }
    }
}

impl FromStr for Period {
    type Err = LandscapeError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let caps = period_regex()?
            .captures(s)
            .ok_or_parse(&format!("Invalid period '{}', expected YYYY or YYYY-MM", s))?;

        let year: i32 = caps
            .get(1)
            .ok_or_parse("Missing year")?
            .as_str()
            .parse()
            .map_err(|e| LandscapeError::Parse(format!("Invalid year in '{}': {}", s, e)))?;

        match caps.get(2) {
            Some(m) => {
                let month: u32 = m
                    .as_str()
                    .parse()
                    .map_err(|e| LandscapeError::Parse(format!("Invalid month in '{}': {}", s, e)))?;
                Period::month(year, month)
            }
            None => Ok(Period::Year(year)),
        }
    }
}

impl TryFrom<String> for Period {
    type Error = LandscapeError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Period> for String {
    fn from(period: Period) -> Self {
        period.to_string()
    }
}
