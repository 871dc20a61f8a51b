//! Accounting period type.
//!
//! A period is one calendar month, written `YYYY-MM`. Periods order
//! chronologically and are the unit of balance aggregation, closing, and
//! rollover.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error produced when parsing a period string.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid period: {0} (expected YYYY-MM)")]
pub struct PeriodParseError(pub String);

/// A calendar-month accounting period.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(into = "String", try_from = "String")]
pub struct Period {
    year: i32,
    month: u32,
}

impl Period {
    /// Creates a period, returning `None` when the month is out of range.
    #[must_use]
    pub fn new(year: i32, month: u32) -> Option<Self> {
        if (1..=12).contains(&month) {
            Some(Self { year, month })
        } else {
            None
        }
    }

    /// The period containing the given date.
    #[must_use]
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// The calendar year.
    #[must_use]
    pub fn year(&self) -> i32 {
        self.year
    }

    /// The calendar month (1-12).
    #[must_use]
    pub fn month(&self) -> u32 {
        self.month
    }

    /// The following period.
    #[must_use]
    pub fn next(&self) -> Self {
        if self.month == 12 {
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

    /// The preceding period.
    #[must_use]
    pub fn prev(&self) -> Self {
        if self.month == 1 {
            Self {
                year: self.year - 1,
                month: 12,
            }
        } else {
            Self {
                year: self.year,
                month: self.month - 1,
            }
        }
    }

    /// The first day of the period.
    #[must_use]
    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
            .expect("period months are validated on construction")
    }

    /// The last day of the period.
    #[must_use]
    pub fn last_day(&self) -> NaiveDate {
        self.first_day()
            .checked_add_months(Months::new(1))
            .and_then(|d| d.pred_opt())
            .expect("period months are validated on construction")
    }

    /// Returns true if the given date falls within this period.
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for Period {
    type Err = PeriodParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || PeriodParseError(s.to_string());
        let (year, month) = s.split_once('-').ok_or_else(err)?;
        if year.len() != 4 || month.len() != 2 {
            return Err(err());
        }
        let year: i32 = year.parse().map_err(|_| err())?;
        let month: u32 = month.parse().map_err(|_| err())?;
        Self::new(year, month).ok_or_else(err)
    }
}

impl TryFrom<String> for Period {
    type Error = PeriodParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Period> for String {
    fn from(period: Period) -> Self {
        period.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let period: Period = "2025-01".parse().unwrap();
        assert_eq!(period.year(), 2025);
        assert_eq!(period.month(), 1);
        assert_eq!(period.to_string(), "2025-01");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!("2025-13".parse::<Period>().is_err());
        assert!("2025-00".parse::<Period>().is_err());
        assert!("2025".parse::<Period>().is_err());
        assert!("25-01".parse::<Period>().is_err());
        assert!("2025-1".parse::<Period>().is_err());
    }

    #[test]
    fn test_next_and_prev_cross_year() {
        let dec: Period = "2024-12".parse().unwrap();
        assert_eq!(dec.next().to_string(), "2025-01");
        let jan: Period = "2025-01".parse().unwrap();
        assert_eq!(jan.prev().to_string(), "2024-12");
    }

    #[test]
    fn test_from_date() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 15).unwrap();
        assert_eq!(Period::from_date(date).to_string(), "2025-03");
    }

    #[test]
    fn test_day_bounds() {
        let feb: Period = "2024-02".parse().unwrap();
        assert_eq!(feb.first_day(), NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
        assert_eq!(feb.last_day(), NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
        assert!(feb.contains(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()));
        assert!(!feb.contains(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()));
    }

    #[test]
    fn test_ordering() {
        let a: Period = "2024-12".parse().unwrap();
        let b: Period = "2025-01".parse().unwrap();
        assert!(a < b);
    }
}
