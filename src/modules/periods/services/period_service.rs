use chrono::{Days, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::CommissionSettings;
use crate::core::money::{format_money, parse_money};
use crate::core::validation::{
    parse_optional_date, parse_optional_id, parse_reference_month, reference_month_of,
};
use crate::core::{AppError, Result};
use crate::modules::advances::models::Advance;
use crate::modules::advances::repositories::AdvanceRepository;
use crate::modules::commissions::models::CommissionSummary;
use crate::modules::payables::models::{CostType, EmittedPayable, PayableRequest, COMMISSION_PERIOD_ORIGIN};
use crate::modules::payables::repositories::PayableEmitter;
use crate::modules::periods::models::{
    ClosePeriodCommand, ClosedPeriod, CommissionPeriod, CreatePeriodRequest, PeriodFilter,
};
use crate::modules::periods::repositories::PeriodRepository;
use crate::modules::professionals::repositories::ProfessionalDirectory;

/// What a close actually achieved
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClosePeriodOutcome {
    pub period: CommissionPeriod,
    /// `None` when nothing was owed or emission failed
    pub payable: Option<EmittedPayable>,
    pub advances_deducted: usize,
    pub total_advances_amount: Decimal,
    /// Two-decimal rendering of `total_advances_amount`
    pub total_advances_formatted: String,
    pub items_processed: u64,
}

/// What a reconciliation pass repaired
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileOutcome {
    pub period: CommissionPeriod,
    pub payable: Option<EmittedPayable>,
}

/// Commission period use-cases
///
/// The close runs in two parts. Advance deduction, the item sweep, totals
/// and the status change commit together in the period store; payable
/// emission and linking follow outside that transaction and only log on
/// failure. `reconcile_closed_period` re-runs the second part.
pub struct PeriodService {
    periods: Arc<dyn PeriodRepository>,
    advances: Arc<dyn AdvanceRepository>,
    payables: Arc<dyn PayableEmitter>,
    professionals: Arc<dyn ProfessionalDirectory>,
    settings: CommissionSettings,
}

impl PeriodService {
    pub fn new(
        periods: Arc<dyn PeriodRepository>,
        advances: Arc<dyn AdvanceRepository>,
            payables: Arc<dyn PayableEmitter>,
        professionals: Arc<dyn ProfessionalDirectory>,
        settings: CommissionSettings,
    ) -> Self {
        Self {
            periods,
            advances,
            payables,
            professionals,
            settings,
        }
    }

    /// Returns the professional's open period, creating one for
    /// `reference_month` when there is none
    pub async fn get_or_create_open_period(
        &self,
        tenant_id: Uuid,
        professional_id: Uuid,
        reference_month: &str,
        unit_id: Option<Uuid>,
    ) -> Result<CommissionPeriod> {
        if let Some(open) = self
            .periods
            .find_open_by_professional(tenant_id, professional_id)
            .await?
        {
            debug!(
                tenant_id = %tenant_id,
                professional_id = %professional_id,
                period_id = %open.id,
                "Open period already exists"
            );
            return Ok(open);
        }

        let period = CommissionPeriod::for_month(tenant_id, unit_id, Some(professional_id), reference_month)?;
        let stored = self.periods.create(&period).await?;

        if stored.id == period.id {
            info!(
                tenant_id = %tenant_id,
                professional_id = %professional_id,
                period_id = %stored.id,
                reference_month = %stored.reference_month,
                "Commission period opened"
            );
        }
        Ok(stored)
    }

    /// Explicit creation; a professional with an open period gets that period back
    ///
    /// A blank reference month is taken from `period_start`.
    pub async fn create_period(&self, tenant_id: Uuid, request: CreatePeriodRequest) -> Result<CommissionPeriod> {
        let professional_id = parse_optional_id("professional_id", request.professional_id.as_deref())?;
        let unit_id = parse_optional_id("unit_id", request.unit_id.as_deref())?;
        let explicit_start = parse_optional_date("period_start", request.period_start.as_deref())?;

        let reference_month = match (request.reference_month.trim(), explicit_start) {
            ("", Some(start)) => reference_month_of(start),
            ("", None) => {
                return Err(AppError::validation(
                    "reference_month is required when period_start is absent",
                ))
            }
            (month, _) => month.to_string(),
        };
        let (month_start, month_end) = parse_reference_month(&reference_month)?;
        let start = explicit_start.unwrap_or(month_start);
        let end = parse_optional_date("period_end", request.period_end.as_deref())?.unwrap_or(month_end);

        let mut period = CommissionPeriod::new(tenant_id, unit_id, professional_id, reference_month, start, end)?;
        period.notes = request.notes.filter(|n| !n.trim().is_empty());

        let stored = self.periods.create(&period).await?;
        info!(tenant_id = %tenant_id, period_id = %stored.id, "Commission period created");
        Ok(stored)
    }

    pub async fn get_period(&self, tenant_id: Uuid, id: Uuid) -> Result<CommissionPeriod> {
        self.periods
            .find_by_id(tenant_id, id)
            .await?
            .ok_or_else(|| AppError::PeriodNotFound(id.to_string()))
    }

    pub async fn list_periods(&self, tenant_id: Uuid, filter: &PeriodFilter) -> Result<Vec<CommissionPeriod>> {
        self.periods.list(tenant_id, filter).await
    }

    pub async fn period_summary(&self, tenant_id: Uuid, id: Uuid) -> Result<CommissionSummary> {
        let period = self.get_period(tenant_id, id).await?;
        self.periods.summary(&period).await
    }

    /// Recomputes running totals of an open period from its items
    pub async fn refresh_totals(&self, tenant_id: Uuid, id: Uuid) -> Result<CommissionPeriod> {
        let mut period = self.get_period(tenant_id, id).await?;
        let summary = self.periods.summary(&period).await?;
        period.apply_summary(&summary, Utc::now())?;

        if !self.periods.update_totals(&period).await? {
            return Err(self.lost_race(tenant_id, id, AppError::PeriodCannotAdjust).await);
        }

        debug!(
            tenant_id = %tenant_id,
            period_id = %id,
            total_commission = %period.total_commission,
            items_count = period.items_count,
            "Period totals refreshed"
        );
        Ok(period)
    }

    /// Manual correction added to the net (may be negative)
    pub async fn set_adjustments(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        amount: &str,
        notes: Option<String>,
    ) -> Result<CommissionPeriod> {
        let amount = parse_money("total_adjustments", amount)?;
        let mut period = self.get_period(tenant_id, id).await?;
        period.set_adjustments(amount, notes.filter(|n| !n.trim().is_empty()), Utc::now())?;

        if !self.periods.update_totals(&period).await? {
            return Err(self.lost_race(tenant_id, id, AppError::PeriodCannotAdjust).await);
        }

        info!(tenant_id = %tenant_id, period_id = %id, adjustments = %amount, "Period adjusted");
        Ok(period)
    }

    pub async fn close_period(&self, tenant_id: Uuid, id: Uuid, closed_by: Uuid) -> Result<ClosePeriodOutcome> {
        let period = self.get_period(tenant_id, id).await?;
        if !period.can_close() {
            return Err(AppError::PeriodCannotClose(period.status.to_string()));
        }

        let advances = self.approved_advances(&period).await;

        let ClosedPeriod {
            mut period,
            deducted,
            items_processed,
        } = self
            .periods
            .close(
                tenant_id,
                ClosePeriodCommand {
                    period_id: id,
                    closed_by,
                    closed_at: Utc::now(),
                    advances,
                },
            )
            .await?;

        let total_advances_amount = period.total_advances;
        info!(
            tenant_id = %tenant_id,
            period_id = %id,
            closed_by = %closed_by,
            total_commission = %period.total_commission,
            total_advances = %total_advances_amount,
            total_net = %period.total_net,
            advances_deducted = deducted.len(),
            items_processed,
            "Commission period closed"
        );

        let payable = self.settle(&mut period).await;

        Ok(ClosePeriodOutcome {
            period,
            payable,
            advances_deducted: deducted.len(),
            total_advances_formatted: format_money(total_advances_amount),
            total_advances_amount,
            items_processed,
        })
    }

    /// Retries payable emission and linking for a closed period. Items are
    /// never bound here: the close fixed the set its totals were computed
    /// from. Safe to call any number of times.
    pub async fn reconcile_closed_period(&self, tenant_id: Uuid, id: Uuid) -> Result<ReconcileOutcome> {
        let mut period = self.get_period(tenant_id, id).await?;
        if !period.is_closed() {
            return Err(AppError::PeriodNotClosed(period.status.to_string()));
        }

        let payable = self.settle(&mut period).await;

        info!(
            tenant_id = %tenant_id,
            period_id = %id,
            payable_linked = period.conta_pagar_id.is_some(),
            "Closed period reconciled"
        );

        Ok(ReconcileOutcome { period, payable })
    }

    pub async fn mark_as_paid(&self, tenant_id: Uuid, id: Uuid, paid_by: Uuid) -> Result<CommissionPeriod> {
        let mut period = self.get_period(tenant_id, id).await?;
        let now = Utc::now();
        period.mark_paid(paid_by, now)?;

        if !self.periods.mark_as_paid(tenant_id, id, paid_by, now).await? {
            return Err(self.lost_race(tenant_id, id, AppError::PeriodCannotPay).await);
        }

        info!(tenant_id = %tenant_id, period_id = %id, paid_by = %paid_by, "Commission period paid");
        Ok(period)
    }

    pub async fn delete_period(&self, tenant_id: Uuid, id: Uuid) -> Result<()> {
        let period = self.get_period(tenant_id, id).await?;
        if !period.can_delete() {
            return Err(AppError::PeriodCannotDelete(period.status.to_string()));
        }

        if !self.periods.delete(tenant_id, id).await? {
            return Err(self.lost_race(tenant_id, id, AppError::PeriodCannotDelete).await);
        }

        info!(tenant_id = %tenant_id, period_id = %id, "Commission period deleted");
        Ok(())
    }

    /// Approved advances to deduct; a lookup failure means none are deducted
    async fn approved_advances(&self, period: &CommissionPeriod) -> Vec<Advance> {
        let Some(professional_id) = period.professional_id else {
            return Vec::new();
        };

        match self
            .advances
            .find_approved_by_professional(period.tenant_id, professional_id)
            .await
        {
            Ok(advances) => advances,
            Err(e) => {
                warn!(
                    tenant_id = %period.tenant_id,
                    period_id = %period.id,
                    professional_id = %professional_id,
                    error = %e,
                    "Approved advances unavailable; closing without deductions"
                );
                Vec::new()
            }
        }
    }

    /// Emits and links the payable, best-effort
    async fn settle(&self, period: &mut CommissionPeriod) -> Option<EmittedPayable> {
        let payable = self.emit_payable(period).await?;
        if period.conta_pagar_id.is_some() {
            return Some(payable);
        }

        match self.periods.link_payable(period.tenant_id, period.id, payable.id).await {
            Ok(true) => period.conta_pagar_id = Some(payable.id),
            Ok(false) => warn!(
                tenant_id = %period.tenant_id,
                period_id = %period.id,
                payable_id = %payable.id,
                "Period already linked to another payable"
            ),
            Err(e) => warn!(
                tenant_id = %period.tenant_id,
                period_id = %period.id,
                payable_id = %payable.id,
                error = %e,
                "Failed to link payable to period"
            ),
        }
        Some(payable)
    }

    async fn emit_payable(&self, period: &CommissionPeriod) -> Option<EmittedPayable> {
        let professional_id = period.professional_id?;
        if period.total_net <= Decimal::ZERO {
            debug!(
                tenant_id = %period.tenant_id,
                period_id = %period.id,
                total_net = %period.total_net,
                "Nothing owed; no payable emitted"
            );
            return None;
        }

        let closed_on = period.closed_at.unwrap_or_else(Utc::now).date_naive();
        let Some(due_date) = u64::try_from(self.settings.payable_due_days)
            .ok()
            .and_then(|days| closed_on.checked_add_days(Days::new(days)))
        else {
            warn!(
                tenant_id = %period.tenant_id,
                period_id = %period.id,
                payable_due_days = self.settings.payable_due_days,
                "Payable due date out of range; no payable emitted"
            );
            return None;
        };

        let name = self.professional_name(period.tenant_id, professional_id).await;
        let request = PayableRequest {
            tenant_id: period.tenant_id,
            unit_id: period.unit_id,
            description: format!("Commission {} - {}", period.reference_month, name),
            category: self.settings.payable_category.clone(),
            supplier: name,
            amount: period.total_net,
            due_date,
            cost_type: CostType::Variavel,
            recurring: false,
            observations: Some(period.date_span()),
            origin_type: COMMISSION_PERIOD_ORIGIN.to_string(),
            origin_id: period.id,
        };

        match self.payables.create(&request).await {
            Ok(payable) => {
                info!(
                    tenant_id = %period.tenant_id,
                    period_id = %period.id,
                    payable_id = %payable.id,
                    amount = %payable.amount,
                    due_date = %payable.due_date,
                    "Commission payable emitted"
                );
                Some(payable)
            }
            Err(e) => {
                warn!(
                    tenant_id = %period.tenant_id,
                    period_id = %period.id,
                    error = %e,
                    "Failed to emit commission payable; period stays closed without one"
                );
                None
            }
        }
    }

    async fn professional_name(&self, tenant_id: Uuid, professional_id: Uuid) -> String {
        match self.professionals.find_by_id(tenant_id, professional_id).await {
            Ok(Some(professional)) if !professional.name.trim().is_empty() => professional.name,
            Ok(_) => self.settings.unknown_professional_name.clone(),
            Err(e) => {
                warn!(
                    tenant_id = %tenant_id,
                    professional_id = %professional_id,
                    error = %e,
                    "Professional lookup failed; using placeholder name"
                );
                self.settings.unknown_professional_name.clone()
            }
        }
    }

    /// A guarded write matched nothing: report the status that blocked it
    async fn lost_race(&self, tenant_id: Uuid, id: Uuid, condition: fn(String) -> AppError) -> AppError {
        match self.periods.find_by_id(tenant_id, id).await {
            Ok(Some(current)) => {
                warn!(
                    tenant_id = %tenant_id,
                    period_id = %id,
                    status = %current.status,
                    "Commission period changed concurrently; write rejected"
                );
                condition(current.status.to_string())
            }
            Ok(None) => AppError::PeriodNotFound(id.to_string()),
            Err(e) => e,
        }
    }
}
