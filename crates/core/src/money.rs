//! Exact fixed-point helpers for monetary amounts.
//!
//! Amounts are stored as decimal text and handled as [`Decimal`] in memory.
//! Nothing here ever falls back to zero on malformed input: a value that cannot
//! be parsed surfaces as [`Error::DataIntegrity`].

use num_traits::Zero;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::constants::{MAX_PERCENTAGE, MONEY_DECIMAL_PRECISION, PERCENTAGE_DECIMAL_PRECISION};
use crate::errors::{Error, Result, ValidationError};

/// Parses a stored monetary value. `field` names the column for the error message.
pub fn parse_amount(field: &str, raw: &str) -> Result<Decimal> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(Error::DataIntegrity(format!(
            "monetary field '{}' is empty",
            field
        )));
    }
    trimmed.parse::<Decimal>().map_err(|e| {
        Error::DataIntegrity(format!(
            "monetary field '{}' holds malformed value '{}': {}",
            field, raw, e
        ))
    })
}

/// Like [`parse_amount`] but treats a missing value as a data integrity failure.
pub fn parse_required_amount(field: &str, raw: Option<&str>) -> Result<Decimal> {
    match raw {
        Some(value) => parse_amount(field, value),
        None => Err(Error::DataIntegrity(format!(
            "monetary field '{}' is missing",
            field
        ))),
    }
}

/// Rounds to two decimal places, half away from zero.
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(MONEY_DECIMAL_PRECISION, RoundingStrategy::MidpointAwayFromZero)
}

/// `part / whole * 100`, or zero when `whole` is not positive. Unrounded.
pub fn percentage_of(part: Decimal, whole: Decimal) -> Result<Decimal> {
    if whole <= Decimal::zero() {
        return Ok(Decimal::zero());
    }
    part.checked_div(whole)
        .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
        .ok_or_else(|| overflow("percentage", part, whole))
}

/// Rounds a percentage for reporting.
pub fn round_percentage(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(PERCENTAGE_DECIMAL_PRECISION, RoundingStrategy::MidpointAwayFromZero)
}

pub fn checked_add(a: Decimal, b: Decimal) -> Result<Decimal> {
    a.checked_add(b).ok_or_else(|| overflow("addition", a, b))
}

pub fn checked_sub(a: Decimal, b: Decimal) -> Result<Decimal> {
    a.checked_sub(b).ok_or_else(|| overflow("subtraction", a, b))
}

/// `max(0, a - b)`
pub fn positive_difference(a: Decimal, b: Decimal) -> Result<Decimal> {
    Ok(checked_sub(a, b)?.max(Decimal::zero()))
}

/// Sums amounts exactly. Addition of decimals is associative, so the result
/// does not depend on iteration order.
pub fn sum<I>(amounts: I) -> Result<Decimal>
where
    I: IntoIterator<Item = Decimal>,
{
    amounts
        .into_iter()
        .try_fold(Decimal::zero(), checked_add)
}

/// Arithmetic on stored amounts left the representable range.
fn overflow(operation: &str, a: Decimal, b: Decimal) -> Error {
    Error::DataIntegrity(format!(
        "monetary {} overflowed with operands {} and {}",
        operation, a, b
    ))
}

pub fn ensure_non_negative(field: &str, amount: Decimal) -> Result<()> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(Error::Validation(ValidationError::InvalidInput(format!(
            "{} must not be negative (got {})",
            field, amount
        ))));
    }
    Ok(())
}

/// Percentages (alert percentage, alert thresholds) must lie in `[0, 100]`.
pub fn ensure_percentage(field: &str, value: Decimal) -> Result<()> {
    if value < Decimal::zero() || value > Decimal::from(MAX_PERCENTAGE) {
        return Err(Error::Validation(ValidationError::InvalidInput(format!(
            "{} must be between 0 and {} (got {})",
            field, MAX_PERCENTAGE, value
        ))));
    }
    Ok(())
}
