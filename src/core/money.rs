use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

use crate::core::{AppError, Result};

/// Monetary values carry two decimal places (centavos)
pub const MONEY_SCALE: u32 = 2;

/// Largest magnitude a `DECIMAL(15,2)` amount column holds
pub const MAX_MONEY: Decimal = Decimal::from_parts(2_764_472_319, 232_830, 0, false, 2);

/// Largest rate a `DECIMAL(12,4)` rate column holds
pub const MAX_RATE: Decimal = Decimal::from_parts(3_567_587_327, 232, 0, false, 4);

/// Rounds a value to the currency's minor unit, midpoint away from zero
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// `value * rate / 100`, rounded to the minor unit
pub fn percentage_of(value: Decimal, rate: Decimal) -> Result<Decimal> {
    value
        .checked_mul(rate)
        .and_then(|product| product.checked_div(Decimal::ONE_HUNDRED))
        .map(round_money)
        .ok_or_else(|| AppError::validation(format!("{}% of {} is out of range", rate, value)))
}

/// Parses a monetary string as received from the transport layer
///
/// Rejects blank input, non-numeric input, more than two decimal places and
/// magnitudes beyond [`MAX_MONEY`]. Sign is not checked here; callers decide
/// whether zero or negative is legal.
pub fn parse_money(field: &str, value: &str) -> Result<Decimal> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::validation(format!("{} is required", field)));
    }

    let amount = Decimal::from_str(trimmed).map_err(|_| {
        AppError::validation(format!("{} must be a numeric amount, got '{}'", field, value))
    })?;

    if amount.scale() > MONEY_SCALE {
        return Err(AppError::validation(format!(
            "{} must have at most {} decimal places, got {}",
            field,
            MONEY_SCALE,
            amount.scale()
        )));
    }
    if amount.abs() > MAX_MONEY {
        return Err(AppError::validation(format!(
            "{} cannot exceed {} in magnitude",
            field, MAX_MONEY
        )));
    }

    Ok(amount)
}

/// Parses a rate (percentage or fixed amount); up to four decimal places
pub fn parse_rate(field: &str, value: &str) -> Result<Decimal> {
    let trimmed = value.trim();
    let rate = Decimal::from_str(trimmed).map_err(|_| {
        AppError::validation(format!("{} must be numeric, got '{}'", field, value))
    })?;

    if rate.scale() > 4 {
        return Err(AppError::validation(format!(
            "{} must have at most 4 decimal places",
            field
        )));
    }
    if rate < Decimal::ZERO {
        return Err(AppError::validation(format!("{} cannot be negative", field)));
    }
    if rate > MAX_RATE {
        return Err(AppError::validation(format!("{} cannot exceed {}", field, MAX_RATE)));
    }

    Ok(rate)
}

/// Formats an amount with exactly two decimal places: `80` -> `"80.00"`
pub fn format_money(amount: Decimal) -> String {
    format!("{:.2}", round_money(amount))
}
