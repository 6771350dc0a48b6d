use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::core::money::parse_money;
use crate::core::validation::{parse_id, parse_optional_date, parse_optional_id};
use crate::core::{AppError, Result};
use crate::modules::advances::models::{Advance, AdvanceFilter, CreateAdvanceRequest};
use crate::modules::advances::repositories::AdvanceRepository;

/// Outstanding advance totals for one professional
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdvanceBalance {
    pub professional_id: Uuid,
    pub approved: Decimal,
    pub pending: Decimal,
}

/// Advance ledger use-cases
///
/// Each transition is checked against the loaded record first so the caller
/// gets the specific condition, then written with a guarded update so a
/// concurrent change in between is still rejected.
pub struct AdvanceService {
    advances: Arc<dyn AdvanceRepository>,
}

impl AdvanceService {
    pub fn new(advances: Arc<dyn AdvanceRepository>) -> Self {
        Self { advances }
    }

    pub async fn create_advance(&self, tenant_id: Uuid, request: CreateAdvanceRequest) -> Result<Advance> {
        let professional_id = parse_id("professional_id", &request.professional_id)?;
        let amount = parse_money("amount", &request.amount)?;
        let request_date = parse_optional_date("request_date", request.request_date.as_deref())?
            .unwrap_or_else(|| Utc::now().date_naive());
        let reason = request
            .reason
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty());

        let advance = Advance::new(
            tenant_id,
            parse_optional_id("unit_id", request.unit_id.as_deref())?,
            professional_id,
            amount,
            request_date,
            reason,
        )?;

        let created = self.advances.create(&advance).await?;

        info!(
            tenant_id = %tenant_id,
            advance_id = %created.id,
            professional_id = %professional_id,
            amount = %created.amount,
            "Advance requested"
        );

        Ok(created)
    }

    pub async fn get_advance(&self, tenant_id: Uuid, id: Uuid) -> Result<Advance> {
        self.advances
            .find_by_id(tenant_id, id)
            .await?
            .ok_or_else(|| AppError::AdvanceNotFound(id.to_string()))
    }

    pub async fn list_advances(&self, tenant_id: Uuid, filter: &AdvanceFilter) -> Result<Vec<Advance>> {
        self.advances.list(tenant_id, filter).await
    }

    pub async fn approve_advance(&self, tenant_id: Uuid, id: Uuid, approved_by: Uuid) -> Result<Advance> {
        let mut advance = self.get_advance(tenant_id, id).await?;
        let now = Utc::now();
        advance.approve(approved_by, now)?;

        if !self.advances.approve(tenant_id, id, approved_by, now).await? {
            return Err(self.lost_race(tenant_id, id, AppError::AdvanceCannotApprove).await);
        }

        info!(tenant_id = %tenant_id, advance_id = %id, approved_by = %approved_by, "Advance approved");
        Ok(advance)
    }

    /// Rejection needs a non-blank reason; without one nothing is written
    pub async fn reject_advance(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        rejected_by: Uuid,
        reason: &str,
    ) -> Result<Advance> {
        if reason.trim().is_empty() {
            return Err(AppError::validation("Rejection reason is required"));
        }

        let mut advance = self.get_advance(tenant_id, id).await?;
        let now = Utc::now();
        advance.reject(rejected_by, reason, now)?;

        let stored_reason = advance.rejection_reason.clone().unwrap_or_default();
        if !self
            .advances
            .reject(tenant_id, id, rejected_by, &stored_reason, now)
            .await?
        {
            return Err(self.lost_race(tenant_id, id, AppError::AdvanceCannotReject).await);
        }

        info!(tenant_id = %tenant_id, advance_id = %id, rejected_by = %rejected_by, "Advance rejected");
        Ok(advance)
    }

    pub async fn mark_deducted(&self, tenant_id: Uuid, id: Uuid, period_id: Uuid) -> Result<Advance> {
        let mut advance = self.get_advance(tenant_id, id).await?;
        let now = Utc::now();
        advance.mark_deducted(period_id, now)?;

        if !self.advances.mark_deducted(tenant_id, id, period_id, now).await? {
            return Err(self.lost_race(tenant_id, id, AppError::AdvanceCannotDeduct).await);
        }

        info!(tenant_id = %tenant_id, advance_id = %id, period_id = %period_id, "Advance deducted");
        Ok(advance)
    }

    pub async fn cancel_advance(&self, tenant_id: Uuid, id: Uuid) -> Result<Advance> {
        let mut advance = self.get_advance(tenant_id, id).await?;
        let now = Utc::now();
        advance.cancel(now)?;

        if !self.advances.cancel(tenant_id, id, now).await? {
            return Err(self.lost_race(tenant_id, id, AppError::AdvanceCannotCancel).await);
        }

        info!(tenant_id = %tenant_id, advance_id = %id, "Advance cancelled");
        Ok(advance)
    }

    pub async fn delete_advance(&self, tenant_id: Uuid, id: Uuid) -> Result<()> {
        let advance = self.get_advance(tenant_id, id).await?;
        if !advance.can_delete() {
            return Err(AppError::AdvanceCannotDelete(advance.status.to_string()));
        }

        if !self.advances.delete(tenant_id, id).await? {
            return Err(self.lost_race(tenant_id, id, AppError::AdvanceCannotDelete).await);
        }

        info!(tenant_id = %tenant_id, advance_id = %id, "Advance deleted");
        Ok(())
    }

    pub async fn approved_for_professional(&self, tenant_id: Uuid, professional_id: Uuid) -> Result<Vec<Advance>> {
        self.advances
            .find_approved_by_professional(tenant_id, professional_id)
            .await
    }

    pub async fn pending_for_professional(&self, tenant_id: Uuid, professional_id: Uuid) -> Result<Vec<Advance>> {
        self.advances
            .find_pending_by_professional(tenant_id, professional_id)
            .await
    }

    pub async fn balance_for_professional(&self, tenant_id: Uuid, professional_id: Uuid) -> Result<AdvanceBalance> {
        Ok(AdvanceBalance {
            professional_id,
            approved: self.advances.sum_approved(tenant_id, professional_id).await?,
            pending: self.advances.sum_pending(tenant_id, professional_id).await?,
        })
    }

    /// A guarded write matched nothing: report the status that blocked it
    async fn lost_race(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        condition: fn(String) -> AppError,
    ) -> AppError {
        match self.advances.find_by_id(tenant_id, id).await {
            Ok(Some(current)) => {
                warn!(
                    tenant_id = %tenant_id,
                    advance_id = %id,
                    status = %current.status,
                    "Advance changed concurrently; transition rejected"
                );
                condition(current.status.to_string())
            }
            Ok(None) => AppError::AdvanceNotFound(id.to_string()),
            Err(e) => e,
        }
    }
}
