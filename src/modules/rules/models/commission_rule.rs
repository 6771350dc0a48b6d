use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use uuid::Uuid;

use crate::core::{AppError, Result};

/// How a rule's rate is applied to the base value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommissionType {
    /// Rate is a percentage (0-100) of the base value
    Percentual,
    /// Rate is a fixed amount per commissionable line
    Fixo,
}

impl CommissionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Percentual => "PERCENTUAL",
            Self::Fixo => "FIXO",
        }
    }
}

impl std::fmt::Display for CommissionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for CommissionType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "PERCENTUAL" => Ok(Self::Percentual),
            "FIXO" => Ok(Self::Fixo),
            _ => Err(AppError::validation(format!("Invalid commission type: {}", s))),
        }
    }
}

/// Value the rate is applied to: gross or net of discounts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CalculationBase {
    Bruto,
    Liquido,
}

impl CalculationBase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bruto => "BRUTO",
            Self::Liquido => "LIQUIDO",
        }
    }
}

impl std::fmt::Display for CalculationBase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for CalculationBase {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "BRUTO" => Ok(Self::Bruto),
            "LIQUIDO" => Ok(Self::Liquido),
            _ => Err(AppError::validation(format!("Invalid calculation base: {}", s))),
        }
    }
}

/// Commission rule configured by an operator, scoped to a unit or tenant-wide
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommissionRule {
    pub id: Uuid,
    pub tenant_id: Uuid,
    /// `None` marks a global (tenant-wide) rule
    pub unit_id: Option<Uuid>,
    pub name: String,
    pub commission_type: CommissionType,
    pub default_rate: Decimal,
    pub min_amount: Option<Decimal>,
    pub max_amount: Option<Decimal>,
    pub calculation_base: CalculationBase,
    pub effective_from: NaiveDate,
    /// `None` means open-ended
    pub effective_to: Option<NaiveDate>,
    /// Lower number wins among rules at the same scope
    pub priority: Option<i32>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CommissionRule {
    pub fn new(
        tenant_id: Uuid,
        unit_id: Option<Uuid>,
        name: String,
        commission_type: CommissionType,
        default_rate: Decimal,
        calculation_base: CalculationBase,
        effective_from: NaiveDate,
        effective_to: Option<NaiveDate>,
    ) -> Result<Self> {
        let now = Utc::now();
        let rule = Self {
            id: Uuid::new_v4(),
            tenant_id,
            unit_id,
            name,
            commission_type,
            default_rate,
            min_amount: None,
            max_amount: None,
            calculation_base,
            effective_from,
            effective_to,
            priority: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        rule.validate()?;
        Ok(rule)
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(AppError::validation("Rule name is required"));
        }

        if self.default_rate < Decimal::ZERO {
            return Err(AppError::validation("Commission rate cannot be negative"));
        }

        if self.commission_type == CommissionType::Percentual
            && self.default_rate > Decimal::ONE_HUNDRED
        {
            return Err(AppError::validation(format!(
                "Percentage rate must be between 0 and 100, got {}",
                self.default_rate
            )));
        }

        for (label, bound) in [("min_amount", self.min_amount), ("max_amount", self.max_amount)] {
            if matches!(bound, Some(v) if v < Decimal::ZERO) {
                return Err(AppError::validation(format!("{} cannot be negative", label)));
            }
        }

        if let (Some(min), Some(max)) = (self.min_amount, self.max_amount) {
            if min > max {
                return Err(AppError::validation(format!(
                    "min_amount ({}) cannot exceed max_amount ({})",
                    min, max
                )));
            }
        }

        if let Some(to) = self.effective_to {
            if self.effective_from > to {
                return Err(AppError::validation(format!(
                    "effective_from ({}) must be before or equal to effective_to ({})",
                    self.effective_from, to
                )));
            }
        }

        Ok(())
    }

    pub fn is_global(&self) -> bool {
        self.unit_id.is_none()
    }

    /// Active and inside `[effective_from, effective_to]`, open-ended when `effective_to` is absent
    pub fn is_effective_on(&self, date: NaiveDate) -> bool {
        self.is_active
            && self.effective_from <= date
            && self.effective_to.map_or(true, |to| date <= to)
    }

    pub fn deactivate(&mut self) {
        self.is_active = false;
        self.updated_at = Utc::now();
    }

    /// Precedence among rules of the same scope: explicit priority ascending
    /// (absent after present), then most recently created first
    pub fn precedence(a: &CommissionRule, b: &CommissionRule) -> Ordering {
        let by_priority = match (a.priority, b.priority) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        by_priority.then_with(|| b.created_at.cmp(&a.created_at))
    }
}

/// Input for rule creation, as received from the transport layer
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateRuleRequest {
    pub unit_id: Option<String>,
    pub name: String,
    pub commission_type: String,
    pub default_rate: String,
    pub min_amount: Option<String>,
    pub max_amount: Option<String>,
    pub calculation_base: Option<String>,
    pub effective_from: String,
    pub effective_to: Option<String>,
    pub priority: Option<i32>,
}

/// Partial update; absent fields keep their current value
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateRuleRequest {
    pub name: Option<String>,
    pub commission_type: Option<String>,
    pub default_rate: Option<String>,
    pub min_amount: Option<String>,
    pub max_amount: Option<String>,
    pub calculation_base: Option<String>,
    pub effective_from: Option<String>,
    pub effective_to: Option<String>,
    pub priority: Option<i32>,
    pub is_active: Option<bool>,
}
