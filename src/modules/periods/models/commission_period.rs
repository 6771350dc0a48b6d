use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::validation::{parse_reference_month, validate_date_range};
use crate::core::{AppError, Result};
use crate::modules::advances::models::Advance;
use crate::modules::commissions::models::CommissionSummary;
use crate::modules::commissions::services::CommissionCalculator;

/// Period lifecycle: `ABERTO -> FECHADO -> PAGO`, forward only
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PeriodStatus {
    Aberto,
    Fechado,
    Pago,
}

impl PeriodStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Aberto => "ABERTO",
            Self::Fechado => "FECHADO",
            Self::Pago => "PAGO",
        }
    }
}

impl std::fmt::Display for PeriodStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PeriodStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "ABERTO" => Ok(Self::Aberto),
            "FECHADO" => Ok(Self::Fechado),
            "PAGO" => Ok(Self::Pago),
            _ => Err(AppError::validation(format!("Invalid period status: {}", s))),
        }
    }
}

/// Monthly payout bucket for one professional
///
/// Items and advances point back at the period through `period_id` and
/// `deduction_period_id`; the period never owns them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommissionPeriod {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub unit_id: Option<Uuid>,
    /// `YYYY-MM`
    pub reference_month: String,
    pub professional_id: Option<Uuid>,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub total_gross: Decimal,
    pub total_commission: Decimal,
    pub total_advances: Decimal,
    pub total_adjustments: Decimal,
    pub total_net: Decimal,
    pub items_count: i64,
    pub status: PeriodStatus,
    pub conta_pagar_id: Option<Uuid>,
    pub closed_by: Option<Uuid>,
    pub closed_at: Option<DateTime<Utc>>,
    pub paid_by: Option<Uuid>,
    pub paid_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CommissionPeriod {
    pub fn new(
        tenant_id: Uuid,
        unit_id: Option<Uuid>,
        professional_id: Option<Uuid>,
        reference_month: String,
        period_start: NaiveDate,
        period_end: NaiveDate,
    ) -> Result<Self> {
        parse_reference_month(&reference_month)?;
        validate_date_range(period_start, period_end)?;

        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            tenant_id,
            unit_id,
            reference_month,
            professional_id,
            period_start,
            period_end,
            total_gross: Decimal::ZERO,
            total_commission: Decimal::ZERO,
            total_advances: Decimal::ZERO,
            total_adjustments: Decimal::ZERO,
            total_net: Decimal::ZERO,
            items_count: 0,
            status: PeriodStatus::Aberto,
            conta_pagar_id: None,
            closed_by: None,
            closed_at: None,
            paid_by: None,
            paid_at: None,
            notes: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Period spanning the whole reference month
    pub fn for_month(
        tenant_id: Uuid,
        unit_id: Option<Uuid>,
        professional_id: Option<Uuid>,
        reference_month: &str,
    ) -> Result<Self> {
        let (start, end) = parse_reference_month(reference_month)?;
        Self::new(
            tenant_id,
            unit_id,
            professional_id,
            reference_month.trim().to_string(),
            start,
            end,
        )
    }

    pub fn can_close(&self) -> bool {
        self.status == PeriodStatus::Aberto
    }

    pub fn can_pay(&self) -> bool {
        self.status == PeriodStatus::Fechado
    }

    pub fn can_delete(&self) -> bool {
        self.status == PeriodStatus::Aberto
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.status, PeriodStatus::Fechado | PeriodStatus::Pago)
    }

    /// Running totals while the period is open
    pub fn apply_summary(&mut self, summary: &CommissionSummary, at: DateTime<Utc>) -> Result<()> {
        if !self.can_close() {
            return Err(AppError::PeriodCannotAdjust(self.status.to_string()));
        }
        self.total_net =
            CommissionCalculator::net_amount(summary.total_commission, self.total_advances, self.total_adjustments)?;
        self.total_gross = summary.total_gross;
        self.total_commission = summary.total_commission;
        self.items_count = summary.items_count;
        self.updated_at = at;
        Ok(())
    }

    pub fn set_adjustments(&mut self, amount: Decimal, notes: Option<String>, at: DateTime<Utc>) -> Result<()> {
        if !self.can_close() {
            return Err(AppError::PeriodCannotAdjust(self.status.to_string()));
        }
        self.total_net = CommissionCalculator::net_amount(self.total_commission, self.total_advances, amount)?;
        self.total_adjustments = amount;
        if notes.is_some() {
            self.notes = notes;
        }
        self.updated_at = at;
        Ok(())
    }

    /// ABERTO -> FECHADO with totals recomputed from what was actually deducted
    ///
    /// Without a summary the stored commission totals stand.
    pub fn apply_close(
        &mut self,
        summary: Option<&CommissionSummary>,
        deducted: &[Advance],
        closed_by: Uuid,
        at: DateTime<Utc>,
    ) -> Result<()> {
        if !self.can_close() {
            return Err(AppError::PeriodCannotClose(self.status.to_string()));
        }

        let total_advances = deducted
            .iter()
            .try_fold(Decimal::ZERO, |sum, advance| sum.checked_add(advance.amount))
            .ok_or_else(|| AppError::validation("Deducted advances total is out of range"))?;
        let total_commission = summary.map_or(self.total_commission, |s| s.total_commission);
        self.total_net = CommissionCalculator::net_amount(total_commission, total_advances, self.total_adjustments)?;

        if let Some(summary) = summary {
            self.total_gross = summary.total_gross;
            self.total_commission = summary.total_commission;
            self.items_count = summary.items_count;
        }
        self.total_advances = total_advances;
        self.status = PeriodStatus::Fechado;
        self.closed_by = Some(closed_by);
        self.closed_at = Some(at);
        self.updated_at = at;
        Ok(())
    }

    pub fn mark_paid(&mut self, paid_by: Uuid, at: DateTime<Utc>) -> Result<()> {
        if !self.can_pay() {
            return Err(AppError::PeriodCannotPay(self.status.to_string()));
        }
        self.status = PeriodStatus::Pago;
        self.paid_by = Some(paid_by);
        self.paid_at = Some(at);
        self.updated_at = at;
        Ok(())
    }

    /// Human-readable span used in payable observations
    pub fn date_span(&self) -> String {
        format!(
            "Period {} to {}",
            self.period_start.format("%Y-%m-%d"),
            self.period_end.format("%Y-%m-%d")
        )
    }
}

/// Input for explicit period creation
///
/// Without explicit dates the period spans the reference month.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreatePeriodRequest {
    pub unit_id: Option<String>,
    pub professional_id: Option<String>,
    pub reference_month: String,
    pub period_start: Option<String>,
    pub period_end: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct PeriodFilter {
    pub professional_id: Option<Uuid>,
    pub unit_id: Option<Uuid>,
    pub status: Option<PeriodStatus>,
    pub reference_month: Option<String>,
}

impl PeriodFilter {
    pub fn matches(&self, period: &CommissionPeriod) -> bool {
        self.professional_id.map_or(true, |p| period.professional_id == Some(p))
            && self.unit_id.map_or(true, |u| period.unit_id == Some(u))
            && self.status.map_or(true, |s| period.status == s)
            && self
                .reference_month
                .as_deref()
                .map_or(true, |m| period.reference_month == m)
    }
}

/// Everything the store needs to close a period in one transaction
#[derive(Debug, Clone)]
pub struct ClosePeriodCommand {
    pub period_id: Uuid,
    pub closed_by: Uuid,
    pub closed_at: DateTime<Utc>,
    /// Candidates for deduction; ones no longer APPROVED are skipped
    pub advances: Vec<Advance>,
}

/// Result of the transactional part of a close
#[derive(Debug, Clone)]
pub struct ClosedPeriod {
    pub period: CommissionPeriod,
    pub deducted: Vec<Advance>,
    /// PENDENTE items bound to the period by the close itself
    pub items_processed: u64,
}
