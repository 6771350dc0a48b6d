// Advance ledger store
//
// Implements:
// - Create / read / list / guarded delete of advances
// - Guarded status transitions: each UPDATE carries the expected current
//   status in its WHERE clause, so a stale caller changes nothing
// - Approved / pending lookups and sums per professional

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{MySql, MySqlPool, QueryBuilder};
use uuid::Uuid;

use crate::core::validation::stored_id;
use crate::core::{AppError, Result};
use crate::modules::advances::models::{Advance, AdvanceFilter, AdvanceStatus};

#[async_trait]
pub trait AdvanceRepository: Send + Sync {
    async fn create(&self, advance: &Advance) -> Result<Advance>;

    async fn find_by_id(&self, tenant_id: Uuid, id: Uuid) -> Result<Option<Advance>>;

    async fn list(&self, tenant_id: Uuid, filter: &AdvanceFilter) -> Result<Vec<Advance>>;

    /// Deletes only while PENDING; false when nothing matched
    async fn delete(&self, tenant_id: Uuid, id: Uuid) -> Result<bool>;

    /// PENDING -> APPROVED; false when the advance is absent or not PENDING
    async fn approve(&self, tenant_id: Uuid, id: Uuid, approved_by: Uuid, at: DateTime<Utc>) -> Result<bool>;

    /// PENDING -> REJECTED
    async fn reject(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        rejected_by: Uuid,
        reason: &str,
        at: DateTime<Utc>,
    ) -> Result<bool>;

    /// APPROVED -> DEDUCTED with the deducting period recorded
    async fn mark_deducted(&self, tenant_id: Uuid, id: Uuid, period_id: Uuid, at: DateTime<Utc>) -> Result<bool>;

    /// PENDING | APPROVED -> CANCELLED
    async fn cancel(&self, tenant_id: Uuid, id: Uuid, at: DateTime<Utc>) -> Result<bool>;

    /// APPROVED advances not yet deducted, oldest first
    async fn find_approved_by_professional(&self, tenant_id: Uuid, professional_id: Uuid) -> Result<Vec<Advance>>;

    async fn find_pending_by_professional(&self, tenant_id: Uuid, professional_id: Uuid) -> Result<Vec<Advance>>;

    async fn sum_approved(&self, tenant_id: Uuid, professional_id: Uuid) -> Result<Decimal>;

    async fn sum_pending(&self, tenant_id: Uuid, professional_id: Uuid) -> Result<Decimal>;
}

const ADVANCE_COLUMNS: &str = r#"
    id, tenant_id, unit_id, professional_id, amount, request_date, reason, status,
    approved_by, approved_at, rejected_by, rejected_at, rejection_reason,
    deduction_period_id, deducted_at, cancelled_at, created_at, updated_at
"#;

pub struct MySqlAdvanceRepository {
    pool: MySqlPool,
}

impl MySqlAdvanceRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    async fn find_by_professional_and_status(
        &self,
        tenant_id: Uuid,
        professional_id: Uuid,
        status: AdvanceStatus,
    ) -> Result<Vec<Advance>> {
        let sql = format!(
            r#"
            SELECT {} FROM advances
            WHERE tenant_id = ? AND professional_id = ? AND status = ?
            ORDER BY request_date ASC, created_at ASC
            "#,
            ADVANCE_COLUMNS
        );
        let rows = sqlx::query_as::<_, AdvanceRow>(&sql)
            .bind(tenant_id.to_string())
            .bind(professional_id.to_string())
            .bind(status.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to fetch advances: {}", e)))?;

        rows.into_iter().map(|row| row.try_into()).collect()
    }

    async fn sum_by_status(&self, tenant_id: Uuid, professional_id: Uuid, status: AdvanceStatus) -> Result<Decimal> {
        let total: Option<Decimal> = sqlx::query_scalar(
            r#"
            SELECT SUM(amount) FROM advances
            WHERE tenant_id = ? AND professional_id = ? AND status = ?
            "#,
        )
        .bind(tenant_id.to_string())
        .bind(professional_id.to_string())
        .bind(status.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to sum advances: {}", e)))?;

        Ok(total.unwrap_or(Decimal::ZERO))
    }
}

#[async_trait]
impl AdvanceRepository for MySqlAdvanceRepository {
    async fn create(&self, advance: &Advance) -> Result<Advance> {
        sqlx::query(
            r#"
            INSERT INTO advances (
                id, tenant_id, unit_id, professional_id, amount, request_date,
                reason, status, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(advance.id.to_string())
        .bind(advance.tenant_id.to_string())
        .bind(advance.unit_id.map(|u| u.to_string()))
        .bind(advance.professional_id.to_string())
        .bind(advance.amount)
        .bind(advance.request_date)
        .bind(&advance.reason)
        .bind(advance.status.as_str())
        .bind(advance.created_at)
        .bind(advance.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to create advance: {}", e)))?;

        Ok(advance.clone())
    }

    async fn find_by_id(&self, tenant_id: Uuid, id: Uuid) -> Result<Option<Advance>> {
        let sql = format!(
            "SELECT {} FROM advances WHERE tenant_id = ? AND id = ?",
            ADVANCE_COLUMNS
        );
        let row = sqlx::query_as::<_, AdvanceRow>(&sql)
            .bind(tenant_id.to_string())
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to fetch advance: {}", e)))?;

        row.map(Advance::try_from).transpose()
    }

    async fn list(&self, tenant_id: Uuid, filter: &AdvanceFilter) -> Result<Vec<Advance>> {
        let mut builder: QueryBuilder<MySql> = QueryBuilder::new(format!(
            "SELECT {} FROM advances WHERE tenant_id = ",
            ADVANCE_COLUMNS
        ));
        builder.push_bind(tenant_id.to_string());

        if let Some(professional_id) = filter.professional_id {
            builder.push(" AND professional_id = ").push_bind(professional_id.to_string());
        }
        if let Some(unit_id) = filter.unit_id {
            builder.push(" AND unit_id = ").push_bind(unit_id.to_string());
        }
        if let Some(status) = filter.status {
            builder.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(from) = filter.from {
            builder.push(" AND request_date >= ").push_bind(from);
        }
        if let Some(to) = filter.to {
            builder.push(" AND request_date <= ").push_bind(to);
        }
        builder.push(" ORDER BY request_date DESC, created_at DESC");

        let rows = builder
            .build_query_as::<AdvanceRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to list advances: {}", e)))?;

        rows.into_iter().map(|row| row.try_into()).collect()
    }

    async fn delete(&self, tenant_id: Uuid, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM advances WHERE tenant_id = ? AND id = ? AND status = 'PENDING'")
            .bind(tenant_id.to_string())
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to delete advance: {}", e)))?;

        Ok(result.rows_affected() > 0)
    }

    async fn approve(&self, tenant_id: Uuid, id: Uuid, approved_by: Uuid, at: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE advances
            SET status = 'APPROVED', approved_by = ?, approved_at = ?, updated_at = ?
            WHERE tenant_id = ? AND id = ? AND status = 'PENDING'
            "#,
        )
        .bind(approved_by.to_string())
        .bind(at)
        .bind(at)
        .bind(tenant_id.to_string())
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to approve advance: {}", e)))?;

        Ok(result.rows_affected() > 0)
    }

    async fn reject(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        rejected_by: Uuid,
        reason: &str,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE advances
            SET status = 'REJECTED', rejected_by = ?, rejected_at = ?,
                rejection_reason = ?, updated_at = ?
            WHERE tenant_id = ? AND id = ? AND status = 'PENDING'
            "#,
        )
        .bind(rejected_by.to_string())
        .bind(at)
        .bind(reason)
        .bind(at)
        .bind(tenant_id.to_string())
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to reject advance: {}", e)))?;

        Ok(result.rows_affected() > 0)
    }

    async fn mark_deducted(&self, tenant_id: Uuid, id: Uuid, period_id: Uuid, at: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE advances
            SET status = 'DEDUCTED', deduction_period_id = ?, deducted_at = ?, updated_at = ?
            WHERE tenant_id = ? AND id = ? AND status = 'APPROVED'
            "#,
        )
        .bind(period_id.to_string())
        .bind(at)
        .bind(at)
        .bind(tenant_id.to_string())
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to deduct advance: {}", e)))?;

        Ok(result.rows_affected() > 0)
    }

    async fn cancel(&self, tenant_id: Uuid, id: Uuid, at: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE advances
            SET status = 'CANCELLED', cancelled_at = ?, updated_at = ?
            WHERE tenant_id = ? AND id = ? AND status IN ('PENDING', 'APPROVED')
            "#,
        )
        .bind(at)
        .bind(at)
        .bind(tenant_id.to_string())
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to cancel advance: {}", e)))?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_approved_by_professional(&self, tenant_id: Uuid, professional_id: Uuid) -> Result<Vec<Advance>> {
        self.find_by_professional_and_status(tenant_id, professional_id, AdvanceStatus::Approved)
            .await
    }

    async fn find_pending_by_professional(&self, tenant_id: Uuid, professional_id: Uuid) -> Result<Vec<Advance>> {
        self.find_by_professional_and_status(tenant_id, professional_id, AdvanceStatus::Pending)
            .await
    }

    async fn sum_approved(&self, tenant_id: Uuid, professional_id: Uuid) -> Result<Decimal> {
        self.sum_by_status(tenant_id, professional_id, AdvanceStatus::Approved).await
    }

    async fn sum_pending(&self, tenant_id: Uuid, professional_id: Uuid) -> Result<Decimal> {
        self.sum_by_status(tenant_id, professional_id, AdvanceStatus::Pending).await
    }
}

/// Database row representation for advances table
#[derive(sqlx::FromRow)]
struct AdvanceRow {
    id: String,
    tenant_id: String,
    unit_id: Option<String>,
    professional_id: String,
    amount: Decimal,
    request_date: NaiveDate,
    reason: Option<String>,
    status: String,
    approved_by: Option<String>,
    approved_at: Option<DateTime<Utc>>,
    rejected_by: Option<String>,
    rejected_at: Option<DateTime<Utc>>,
    rejection_reason: Option<String>,
    deduction_period_id: Option<String>,
    deducted_at: Option<DateTime<Utc>>,
    cancelled_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<AdvanceRow> for Advance {
    type Error = AppError;

    fn try_from(row: AdvanceRow) -> Result<Self> {
        let status = row
            .status
            .parse::<AdvanceStatus>()
            .map_err(|_| AppError::Internal(format!("Invalid advance status: {}", row.status)))?;

        Ok(Advance {
            id: stored_id(&row.id)?,
            tenant_id: stored_id(&row.tenant_id)?,
            unit_id: row.unit_id.as_deref().map(stored_id).transpose()?,
            professional_id: stored_id(&row.professional_id)?,
            amount: row.amount,
            request_date: row.request_date,
            reason: row.reason,
            status,
            approved_by: row.approved_by.as_deref().map(stored_id).transpose()?,
            approved_at: row.approved_at,
            rejected_by: row.rejected_by.as_deref().map(stored_id).transpose()?,
            rejected_at: row.rejected_at,
            rejection_reason: row.rejection_reason,
            deduction_period_id: row.deduction_period_id.as_deref().map(stored_id).transpose()?,
            deducted_at: row.deducted_at,
            cancelled_at: row.cancelled_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
