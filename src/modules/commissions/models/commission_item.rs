use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::{AppError, Result};
use crate::modules::commissions::services::CommissionCalculator;
use crate::modules::rules::models::CommissionType;

/// Where an item's rate came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommissionSource {
    /// Rate configured on the service sold
    Servico,
    /// Rate configured on the professional
    Profissional,
    /// Rate from the resolved rule hierarchy
    Regra,
    /// Operator override (explicit rule or rate)
    Manual,
}

impl CommissionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Servico => "SERVICO",
            Self::Profissional => "PROFISSIONAL",
            Self::Regra => "REGRA",
            Self::Manual => "MANUAL",
        }
    }
}

impl std::fmt::Display for CommissionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for CommissionSource {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "SERVICO" => Ok(Self::Servico),
            "PROFISSIONAL" => Ok(Self::Profissional),
            "REGRA" => Ok(Self::Regra),
            "MANUAL" => Ok(Self::Manual),
            _ => Err(AppError::validation(format!("Invalid commission source: {}", s))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommissionItemStatus {
    Pendente,
    Processado,
}

impl CommissionItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pendente => "PENDENTE",
            Self::Processado => "PROCESSADO",
        }
    }
}

impl std::fmt::Display for CommissionItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for CommissionItemStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "PENDENTE" => Ok(Self::Pendente),
            "PROCESSADO" => Ok(Self::Processado),
            _ => Err(AppError::validation(format!("Invalid commission item status: {}", s))),
        }
    }
}

/// Everything needed to compute a commission line
#[derive(Debug, Clone)]
pub struct CommissionItemDraft {
    pub tenant_id: Uuid,
    pub unit_id: Option<Uuid>,
    pub professional_id: Uuid,
    pub command_id: Option<Uuid>,
    pub command_item_id: Option<Uuid>,
    pub appointment_id: Option<Uuid>,
    pub service_id: Option<Uuid>,
    pub gross_value: Decimal,
    pub commission_rate: Decimal,
    pub commission_type: CommissionType,
    pub commission_source: CommissionSource,
    pub rule_id: Option<Uuid>,
    pub reference_date: NaiveDate,
}

/// One line of earned commission tied to a sold service or product
///
/// `commission_value` is fixed at creation from gross value, rate and type.
/// Re-rating means deleting a pending item and creating a new one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommissionItem {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub unit_id: Option<Uuid>,
    pub professional_id: Uuid,
    pub command_id: Option<Uuid>,
    pub command_item_id: Option<Uuid>,
    pub appointment_id: Option<Uuid>,
    pub service_id: Option<Uuid>,
    pub gross_value: Decimal,
    pub commission_rate: Decimal,
    pub commission_type: CommissionType,
    pub commission_value: Decimal,
    pub commission_source: CommissionSource,
    pub rule_id: Option<Uuid>,
    pub reference_date: NaiveDate,
    pub status: CommissionItemStatus,
    pub period_id: Option<Uuid>,
    pub processed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CommissionItem {
    pub fn new(draft: CommissionItemDraft) -> Result<Self> {
        if draft.gross_value < Decimal::ZERO {
            return Err(AppError::validation("Gross value cannot be negative"));
        }

        let commission_value = CommissionCalculator::commission_value(
            draft.gross_value,
            draft.commission_rate,
            draft.commission_type,
        )?;

        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            tenant_id: draft.tenant_id,
            unit_id: draft.unit_id,
            professional_id: draft.professional_id,
            command_id: draft.command_id,
            command_item_id: draft.command_item_id,
            appointment_id: draft.appointment_id,
            service_id: draft.service_id,
            gross_value: draft.gross_value,
            commission_rate: draft.commission_rate,
            commission_type: draft.commission_type,
            commission_value,
            commission_source: draft.commission_source,
            rule_id: draft.rule_id,
            reference_date: draft.reference_date,
            status: CommissionItemStatus::Pendente,
            period_id: None,
            processed_at: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn is_pending(&self) -> bool {
        self.status == CommissionItemStatus::Pendente
    }

    /// PENDENTE -> PROCESSADO, bound to the period that settled it
    pub fn process(&mut self, period_id: Uuid, at: DateTime<Utc>) -> Result<()> {
        if !self.is_pending() {
            return Err(AppError::ItemAlreadyProcessed(self.id.to_string()));
        }
        self.status = CommissionItemStatus::Processado;
        self.period_id = Some(period_id);
        self.processed_at = Some(at);
        self.updated_at = at;
        Ok(())
    }

    pub fn ensure_deletable(&self) -> Result<()> {
        if !self.is_pending() {
            return Err(AppError::ItemCannotDelete(self.status.to_string()));
        }
        Ok(())
    }
}

/// Input for item creation, as received from the point of sale
///
/// Rate selection: `rule_id` forces that rule (MANUAL); `commission_rate`
/// with `commission_type` uses the given rate and `commission_source`;
/// otherwise the rule hierarchy decides (REGRA).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateCommissionItemRequest {
    pub unit_id: Option<String>,
    pub professional_id: String,
    pub command_id: Option<String>,
    pub command_item_id: Option<String>,
    pub appointment_id: Option<String>,
    pub service_id: Option<String>,
    pub gross_value: String,
    pub reference_date: String,
    pub rule_id: Option<String>,
    pub commission_rate: Option<String>,
    pub commission_type: Option<String>,
    pub commission_source: Option<String>,
}

/// Descriptive fields only; value fields are immutable
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateCommissionItemRequest {
    pub reference_date: Option<String>,
    pub service_id: Option<String>,
    pub appointment_id: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct CommissionItemFilter {
    pub professional_id: Option<Uuid>,
    pub unit_id: Option<Uuid>,
    pub status: Option<CommissionItemStatus>,
    pub period_id: Option<Uuid>,
    pub command_id: Option<Uuid>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl CommissionItemFilter {
    pub fn matches(&self, item: &CommissionItem) -> bool {
        self.professional_id.map_or(true, |p| item.professional_id == p)
            && self.unit_id.map_or(true, |u| item.unit_id == Some(u))
            && self.status.map_or(true, |s| item.status == s)
            && self.period_id.map_or(true, |p| item.period_id == Some(p))
            && self.command_id.map_or(true, |c| item.command_id == Some(c))
            && self.from.map_or(true, |from| item.reference_date >= from)
            && self.to.map_or(true, |to| item.reference_date <= to)
    }
}

/// Aggregated totals over a set of items
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommissionSummary {
    pub total_gross: Decimal,
    pub total_commission: Decimal,
    pub items_count: i64,
}

impl CommissionSummary {
    pub fn add(&mut self, item: &CommissionItem) {
        self.total_gross += item.gross_value;
        self.total_commission += item.commission_value;
        self.items_count += 1;
    }

    pub fn from_items<'a>(items: impl IntoIterator<Item = &'a CommissionItem>) -> Self {
        let mut summary = Self::default();
        for item in items {
            summary.add(item);
        }
        summary
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfessionalCommissionSummary {
    pub professional_id: Uuid,
    #[serde(flatten)]
    pub summary: CommissionSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceCommissionSummary {
    /// `None` groups product lines and lines without a service
    pub service_id: Option<Uuid>,
    #[serde(flatten)]
    pub summary: CommissionSummary,
}
