use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::{AppError, Result};

/// Advance lifecycle
///
/// `PENDING -> APPROVED -> DEDUCTED`, `PENDING -> REJECTED`,
/// `PENDING | APPROVED -> CANCELLED`. Every transition is one-directional.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AdvanceStatus {
    Pending,
    Approved,
    Rejected,
    Deducted,
    Cancelled,
}

impl AdvanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
            Self::Deducted => "DEDUCTED",
            Self::Cancelled => "CANCELLED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Rejected | Self::Deducted | Self::Cancelled)
    }
}

impl std::fmt::Display for AdvanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for AdvanceStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "PENDING" => Ok(Self::Pending),
            "APPROVED" => Ok(Self::Approved),
            "REJECTED" => Ok(Self::Rejected),
            "DEDUCTED" => Ok(Self::Deducted),
            "CANCELLED" => Ok(Self::Cancelled),
            _ => Err(AppError::validation(format!("Invalid advance status: {}", s))),
        }
    }
}

/// Salary advance requested against a professional's future commission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Advance {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub unit_id: Option<Uuid>,
    pub professional_id: Uuid,
    pub amount: Decimal,
    pub request_date: NaiveDate,
    pub reason: Option<String>,
    pub status: AdvanceStatus,
    pub approved_by: Option<Uuid>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejected_by: Option<Uuid>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    /// Set exactly when the advance is DEDUCTED
    pub deduction_period_id: Option<Uuid>,
    pub deducted_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Advance {
    pub fn new(
        tenant_id: Uuid,
        unit_id: Option<Uuid>,
        professional_id: Uuid,
        amount: Decimal,
        request_date: NaiveDate,
        reason: Option<String>,
    ) -> Result<Self> {
        if amount <= Decimal::ZERO {
            return Err(AppError::validation("Advance amount must be positive"));
        }

        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            tenant_id,
            unit_id,
            professional_id,
            amount,
            request_date,
            reason,
            status: AdvanceStatus::Pending,
            approved_by: None,
            approved_at: None,
            rejected_by: None,
            rejected_at: None,
            rejection_reason: None,
            deduction_period_id: None,
            deducted_at: None,
            cancelled_at: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn can_approve(&self) -> bool {
        self.status == AdvanceStatus::Pending
    }

    pub fn can_reject(&self) -> bool {
        self.status == AdvanceStatus::Pending
    }

    pub fn can_deduct(&self) -> bool {
        self.status == AdvanceStatus::Approved
    }

    pub fn can_cancel(&self) -> bool {
        matches!(self.status, AdvanceStatus::Pending | AdvanceStatus::Approved)
    }

    pub fn can_delete(&self) -> bool {
        self.status == AdvanceStatus::Pending
    }

    pub fn approve(&mut self, approved_by: Uuid, at: DateTime<Utc>) -> Result<()> {
        if !self.can_approve() {
            return Err(AppError::AdvanceCannotApprove(self.status.to_string()));
        }
        self.status = AdvanceStatus::Approved;
        self.approved_by = Some(approved_by);
        self.approved_at = Some(at);
        self.updated_at = at;
        Ok(())
    }

    /// The reason must be non-blank; a failed call leaves the advance untouched
    pub fn reject(&mut self, rejected_by: Uuid, reason: &str, at: DateTime<Utc>) -> Result<()> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(AppError::validation("Rejection reason is required"));
        }
        if !self.can_reject() {
            return Err(AppError::AdvanceCannotReject(self.status.to_string()));
        }
        self.status = AdvanceStatus::Rejected;
        self.rejected_by = Some(rejected_by);
        self.rejected_at = Some(at);
        self.rejection_reason = Some(reason.to_string());
        self.updated_at = at;
        Ok(())
    }

    pub fn mark_deducted(&mut self, period_id: Uuid, at: DateTime<Utc>) -> Result<()> {
        if !self.can_deduct() {
            return Err(AppError::AdvanceCannotDeduct(self.status.to_string()));
        }
        self.status = AdvanceStatus::Deducted;
        self.deduction_period_id = Some(period_id);
        self.deducted_at = Some(at);
        self.updated_at = at;
        Ok(())
    }

    pub fn cancel(&mut self, at: DateTime<Utc>) -> Result<()> {
        if !self.can_cancel() {
            return Err(AppError::AdvanceCannotCancel(self.status.to_string()));
        }
        self.status = AdvanceStatus::Cancelled;
        self.cancelled_at = Some(at);
        self.updated_at = at;
        Ok(())
    }
}

/// Input for advance creation, as received from the transport layer
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateAdvanceRequest {
    pub unit_id: Option<String>,
    pub professional_id: String,
    pub amount: String,
    /// Defaults to today
    pub request_date: Option<String>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct AdvanceFilter {
    pub professional_id: Option<Uuid>,
    pub unit_id: Option<Uuid>,
    pub status: Option<AdvanceStatus>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl AdvanceFilter {
    pub fn matches(&self, advance: &Advance) -> bool {
        self.professional_id.map_or(true, |p| advance.professional_id == p)
            && self.unit_id.map_or(true, |u| advance.unit_id == Some(u))
            && self.status.map_or(true, |s| advance.status == s)
            && self.from.map_or(true, |from| advance.request_date >= from)
            && self.to.map_or(true, |to| advance.request_date <= to)
    }
}
