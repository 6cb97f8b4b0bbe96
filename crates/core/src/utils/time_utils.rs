use chrono::{Datelike, Duration, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};

/// Inclusive date window `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Builds a range, rejecting `start > end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(Error::InvalidDateRange(format!(
                "start date {} is after end date {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    /// Both bounds are inclusive.
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// Number of calendar days covered, counting both ends.
    pub fn days(&self) -> i64 {
        days_inclusive(self.start, self.end)
    }
}

impl std::fmt::Display for DateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..={}", self.start, self.end)
    }
}

/// Inclusive day count between two dates. Zero or negative when `end < start`.
pub fn days_inclusive(start: NaiveDate, end: NaiveDate) -> i64 {
    (end - start).num_days() + 1
}

pub fn add_days(date: NaiveDate, days: i64) -> Result<NaiveDate> {
    date.checked_add_signed(Duration::days(days))
        .ok_or_else(|| Error::InvalidDateRange(format!("{} + {} days overflows", date, days)))
}

/// Adds calendar months, clamping the day to the target month's length
/// (Jan 31 + 1 month = Feb 28/29).
pub fn add_months_clamped(date: NaiveDate, months: u32) -> Result<NaiveDate> {
    date.checked_add_months(Months::new(months))
        .ok_or_else(|| Error::InvalidDateRange(format!("{} + {} months overflows", date, months)))
}

pub fn last_day_of_month(date: NaiveDate) -> Result<NaiveDate> {
    let first = NaiveDate::from_ymd_opt(date.year(), date.month(), 1)
        .ok_or_else(|| Error::InvalidDateRange(format!("no first day for {}", date)))?;
    let next_first = add_months_clamped(first, 1)?;
    next_first
        .pred_opt()
        .ok_or_else(|| Error::InvalidDateRange(format!("no last day for {}", date)))
}

pub fn last_day_of_year(date: NaiveDate) -> Result<NaiveDate> {
    NaiveDate::from_ymd_opt(date.year(), 12, 31)
        .ok_or_else(|| Error::InvalidDateRange(format!("no last day of year for {}", date)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_date_range_rejects_inverted_bounds() {
        let err = DateRange::new(d(2024, 2, 1), d(2024, 1, 31)).unwrap_err();
        assert!(matches!(err, Error::InvalidDateRange(_)));
    }

    #[test]
    fn test_date_range_inclusive_bounds() {
        let range = DateRange::new(d(2024, 1, 1), d(2024, 1, 31)).unwrap();
        assert!(range.contains(d(2024, 1, 1)));
        assert!(range.contains(d(2024, 1, 31)));
        assert!(!range.contains(d(2024, 2, 1)));
        assert_eq!(range.days(), 31);
    }

    #[test]
    fn test_single_day_range() {
        let range = DateRange::new(d(2024, 5, 5), d(2024, 5, 5)).unwrap();
        assert_eq!(range.days(), 1);
    }

    #[test]
    fn test_add_months_clamped() {
        assert_eq!(add_months_clamped(d(2024, 1, 31), 1).unwrap(), d(2024, 2, 29));
        assert_eq!(add_months_clamped(d(2023, 1, 31), 1).unwrap(), d(2023, 2, 28));
        assert_eq!(add_months_clamped(d(2024, 2, 29), 12).unwrap(), d(2025, 2, 28));
    }

    #[test]
    fn test_last_day_of_month() {
        assert_eq!(last_day_of_month(d(2024, 2, 10)).unwrap(), d(2024, 2, 29));
        assert_eq!(last_day_of_month(d(2023, 12, 1)).unwrap(), d(2023, 12, 31));
        assert_eq!(last_day_of_month(d(2023, 4, 30)).unwrap(), d(2023, 4, 30));
    }
}
