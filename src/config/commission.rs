use crate::core::{AppError, Result};
use serde::Deserialize;
use std::env;

/// Longest accepted gap between a close and its payable's due date
pub const MAX_PAYABLE_DUE_DAYS: i64 = 365;

/// Knobs for the period close and the payable it emits
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CommissionSettings {
    /// Calendar days between the close and the payable's due date
    pub payable_due_days: i64,
    pub payable_category: String,
    /// Used in the payable description when the directory has no name
    pub unknown_professional_name: String,
}

impl Default for CommissionSettings {
    fn default() -> Self {
        Self {
            payable_due_days: 7,
            payable_category: "commission".to_string(),
            unknown_professional_name: "Professional".to_string(),
        }
    }
}

impl CommissionSettings {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        Ok(Self {
            payable_due_days: match env::var("COMMISSION_PAYABLE_DUE_DAYS") {
                Ok(value) => value.parse().map_err(|_| {
                    AppError::Configuration("Invalid COMMISSION_PAYABLE_DUE_DAYS".to_string())
                })?,
                Err(_) => defaults.payable_due_days,
            },
            payable_category: env::var("COMMISSION_PAYABLE_CATEGORY")
                .unwrap_or(defaults.payable_category),
            unknown_professional_name: env::var("COMMISSION_UNKNOWN_PROFESSIONAL")
                .unwrap_or(defaults.unknown_professional_name),
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.payable_due_days <= 0 || self.payable_due_days > MAX_PAYABLE_DUE_DAYS {
            return Err(AppError::Configuration(format!(
                "Payable due days must be between 1 and {}",
                MAX_PAYABLE_DUE_DAYS
            )));
        }

        if self.payable_category.trim().is_empty() {
            return Err(AppError::Configuration(
                "Payable category cannot be empty".to_string(),
            ));
        }

        if self.unknown_professional_name.trim().is_empty() {
            return Err(AppError::Configuration(
                "Placeholder professional name cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}
