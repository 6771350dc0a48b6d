use rust_decimal::Decimal;

use crate::core::money::{percentage_of, round_money};
use crate::core::{AppError, Result};
use crate::modules::rules::models::CommissionType;

/// Computes commission values from a base value and a rate
///
/// PERCENTUAL: `base * rate / 100` rounded to centavos.
/// FIXO: the rate itself is the amount owed for the line.
pub struct CommissionCalculator;

impl CommissionCalculator {
    pub fn commission_value(base: Decimal, rate: Decimal, commission_type: CommissionType) -> Result<Decimal> {
        if rate < Decimal::ZERO {
            return Err(AppError::validation("Commission rate cannot be negative"));
        }

        match commission_type {
            CommissionType::Percentual => {
                if rate > Decimal::ONE_HUNDRED {
                    return Err(AppError::validation(format!(
                        "Percentage rate must be between 0 and 100, got {}",
                        rate
                    )));
                }
                percentage_of(base, rate)
            }
            CommissionType::Fixo => Ok(round_money(rate)),
        }
    }

    /// `totalCommission - totalAdvances + totalAdjustments`
    pub fn net_amount(total_commission: Decimal, total_advances: Decimal, total_adjustments: Decimal) -> Result<Decimal> {
        total_commission
            .checked_sub(total_advances)
            .and_then(|net| net.checked_add(total_adjustments))
            .ok_or_else(|| AppError::validation("Period net amount is out of range"))
    }
}
