use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::{AppError, Result};

/// Origin tag for payables produced by closing a commission period
pub const COMMISSION_PERIOD_ORIGIN: &str = "COMMISSION_PERIOD";

/// Cost classification used by the financial subsystem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CostType {
    Fixo,
    Variavel,
}

impl CostType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fixo => "FIXO",
            Self::Variavel => "VARIAVEL",
        }
    }
}

impl std::fmt::Display for CostType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for CostType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "FIXO" => Ok(Self::Fixo),
            "VARIAVEL" => Ok(Self::Variavel),
            _ => Err(AppError::validation(format!("Invalid cost type: {}", s))),
        }
    }
}

/// Fully-formed accounts-payable record handed to the financial subsystem
///
/// `(tenant_id, origin_type, origin_id)` identifies the obligation: emitting
/// the same origin twice yields the payable created the first time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayableRequest {
    pub tenant_id: Uuid,
    pub unit_id: Option<Uuid>,
    pub description: String,
    pub category: String,
    pub supplier: String,
    pub amount: Decimal,
    pub due_date: NaiveDate,
    pub cost_type: CostType,
    pub recurring: bool,
    pub observations: Option<String>,
    pub origin_type: String,
    pub origin_id: Uuid,
}

impl PayableRequest {
    pub fn validate(&self) -> Result<()> {
        if self.description.trim().is_empty() {
            return Err(AppError::validation("Payable description is required"));
        }
        if self.category.trim().is_empty() {
            return Err(AppError::validation("Payable category is required"));
        }
        if self.amount <= Decimal::ZERO {
            return Err(AppError::validation("Payable amount must be positive"));
        }
        Ok(())
    }
}

/// Payable as acknowledged by the financial subsystem
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmittedPayable {
    pub id: Uuid,
    pub description: String,
    pub amount: Decimal,
    pub due_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}
