use chrono::NaiveDate;
use log::debug;

use super::PeriodType;
use crate::constants::WEEKLY_PERIOD_DAYS;
use crate::errors::{Error, Result};
use crate::utils::{
    add_days, add_months_clamped, days_inclusive, last_day_of_month, last_day_of_year, DateRange,
};

/// Start of the period following `[current_start, current_end]`.
///
/// Weekly and custom periods start the day after the current end; monthly and
/// yearly periods advance the current start by one calendar month/year, keeping
/// the day-of-month where the target month allows it.
pub fn next_period_start(
    period_type: PeriodType,
    current_start: NaiveDate,
    current_end: NaiveDate,
) -> Result<NaiveDate> {
    DateRange::new(current_start, current_end)?;
    match period_type {
        PeriodType::Weekly | PeriodType::Custom => add_days(current_end, 1),
        PeriodType::Monthly => add_months_clamped(current_start, 1),
        PeriodType::Yearly => add_months_clamped(current_start, 12),
    }
}

/// End of a period beginning at `start`.
///
/// `fallback_duration_days` is only consulted for custom periods and is the
/// inclusive length of the window to reproduce.
pub fn period_end(
    period_type: PeriodType,
    start: NaiveDate,
    fallback_duration_days: i64,
) -> Result<NaiveDate> {
    let end = match period_type {
        PeriodType::Weekly => add_days(start, WEEKLY_PERIOD_DAYS - 1)?,
        PeriodType::Monthly => last_day_of_month(start)?,
        PeriodType::Yearly => last_day_of_year(start)?,
        PeriodType::Custom => {
            if fallback_duration_days < 1 {
                return Err(Error::InvalidDateRange(format!(
                    "custom period needs a positive duration (got {} days)",
                    fallback_duration_days
                )));
            }
            add_days(start, fallback_duration_days - 1)?
        }
    };
    if end < start {
        return Err(Error::InvalidDateRange(format!(
            "computed end {} precedes start {}",
            end, start
        )));
    }
    Ok(end)
}

/// The full window following `[current_start, current_end]`.
pub fn next_period(
    period_type: PeriodType,
    current_start: NaiveDate,
    current_end: NaiveDate,
) -> Result<DateRange> {
    let start = next_period_start(period_type, current_start, current_end)?;
    let duration = days_inclusive(current_start, current_end);
    let end = period_end(period_type, start, duration)?;
    debug!(
        "Next {} period after {}..={} is {}..={}",
        period_type, current_start, current_end, start, end
    );
    DateRange::new(start, end)
}

/// Window for a newly created budget. An explicit end always wins; otherwise
/// the end is derived from the period type. Custom periods require an end.
pub fn initial_period(
    period_type: PeriodType,
    start: NaiveDate,
    end: Option<NaiveDate>,
) -> Result<DateRange> {
    match end {
        Some(end) => DateRange::new(start, end),
        None if period_type == PeriodType::Custom => Err(Error::InvalidDateRange(
            "custom periods need an explicit end date".to_string(),
        )),
        None => DateRange::new(start, period_end(period_type, start, 0)?),
    }
}
