// Commission period store
//
// Implements:
// - Creation with the one-open-period-per-professional guard: the table
//   carries a generated `open_professional_id` column (professional id while
//   ABERTO, NULL otherwise) under a unique index, so a racing second insert
//   fails and the existing open period is returned instead
// - The transactional part of a close: period row lock, guarded advance
//   deductions, the item sweep, totals and the ABERTO -> FECHADO transition
//   commit together. The sweep binds the professional's PENDENTE items in the
//   span and totals exactly the items bound to the period; it runs under a
//   savepoint so a failed sweep leaves items untouched and the stored totals
//   stand
// - Guarded payment, deletion and totals updates
// - The period summary read from commission_items

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{Acquire, MySql, MySqlConnection, MySqlPool, QueryBuilder};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::core::validation::stored_id;
use crate::core::{AppError, Result};
use crate::modules::commissions::models::CommissionSummary;
use crate::modules::periods::models::{
    ClosePeriodCommand, ClosedPeriod, CommissionPeriod, PeriodFilter, PeriodStatus,
};

#[async_trait]
pub trait PeriodRepository: Send + Sync {
    /// Inserts the period; for a professional who already has an ABERTO
    /// period, returns that period unchanged instead
    async fn create(&self, period: &CommissionPeriod) -> Result<CommissionPeriod>;

    async fn find_by_id(&self, tenant_id: Uuid, id: Uuid) -> Result<Option<CommissionPeriod>>;

    async fn find_open_by_professional(&self, tenant_id: Uuid, professional_id: Uuid) -> Result<Option<CommissionPeriod>>;

    async fn list(&self, tenant_id: Uuid, filter: &PeriodFilter) -> Result<Vec<CommissionPeriod>>;

    /// Writes running totals, adjustments and notes while ABERTO
    async fn update_totals(&self, period: &CommissionPeriod) -> Result<bool>;

    /// Totals over the period's items: those already bound to it plus, for a
    /// professional period, that professional's PENDENTE items in its span
    async fn summary(&self, period: &CommissionPeriod) -> Result<CommissionSummary>;

    /// Deducts advances, binds the period's items and closes it atomically
    ///
    /// Fails with `PeriodNotFound` / `PeriodCannotClose` without writing
    /// anything; any store error outside the item sweep rolls the whole step
    /// back. A failed sweep is logged and the close proceeds on stored totals
    /// with no items bound.
    async fn close(&self, tenant_id: Uuid, command: ClosePeriodCommand) -> Result<ClosedPeriod>;

    /// Sets `conta_pagar_id` when none is linked yet
    async fn link_payable(&self, tenant_id: Uuid, id: Uuid, payable_id: Uuid) -> Result<bool>;

    /// FECHADO -> PAGO
    async fn mark_as_paid(&self, tenant_id: Uuid, id: Uuid, paid_by: Uuid, at: DateTime<Utc>) -> Result<bool>;

    /// Deletes only while ABERTO
    async fn delete(&self, tenant_id: Uuid, id: Uuid) -> Result<bool>;
}

const PERIOD_COLUMNS: &str = r#"
    id, tenant_id, unit_id, reference_month, professional_id, period_start, period_end,
    total_gross, total_commission, total_advances, total_adjustments, total_net,
    items_count, status, conta_pagar_id, closed_by, closed_at, paid_by, paid_at,
    notes, created_at, updated_at
"#;

pub struct MySqlPeriodRepository {
    pool: MySqlPool,
}

impl MySqlPeriodRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Binds the professional's PENDENTE items in the span to the period,
    /// then totals every item bound to it
    async fn sweep_items(
        conn: &mut MySqlConnection,
        period: &CommissionPeriod,
        at: DateTime<Utc>,
    ) -> Result<(CommissionSummary, u64)> {
        let mut processed = 0;
        if let Some(professional_id) = period.professional_id {
            processed = sqlx::query(
                r#"
                UPDATE commission_items
                SET status = 'PROCESSADO', period_id = ?, processed_at = ?, updated_at = ?
                WHERE tenant_id = ? AND professional_id = ? AND status = 'PENDENTE'
                  AND reference_date BETWEEN ? AND ?
                "#,
            )
            .bind(period.id.to_string())
            .bind(at)
            .bind(at)
            .bind(period.tenant_id.to_string())
            .bind(professional_id.to_string())
            .bind(period.period_start)
            .bind(period.period_end)
            .execute(&mut *conn)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to bind items to period: {}", e)))?
            .rows_affected();
        }

        let (total_gross, total_commission, items_count): (Decimal, Decimal, i64) = sqlx::query_as(
            r#"
            SELECT COALESCE(SUM(gross_value), 0),
                   COALESCE(SUM(commission_value), 0),
                   COUNT(*)
            FROM commission_items
            WHERE tenant_id = ? AND period_id = ?
            "#,
        )
        .bind(period.tenant_id.to_string())
        .bind(period.id.to_string())
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to total bound items: {}", e)))?;

        let summary = CommissionSummary {
            total_gross,
            total_commission,
            items_count,
        };
        Ok((summary, processed))
    }
}

#[async_trait]
impl PeriodRepository for MySqlPeriodRepository {
    async fn create(&self, period: &CommissionPeriod) -> Result<CommissionPeriod> {
        let inserted = sqlx::query(
            r#"
            INSERT INTO commission_periods (
                id, tenant_id, unit_id, reference_month, professional_id, period_start,
                period_end, total_gross, total_commission, total_advances, total_adjustments,
                total_net, items_count, status, notes, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(period.id.to_string())
        .bind(period.tenant_id.to_string())
        .bind(period.unit_id.map(|u| u.to_string()))
        .bind(&period.reference_month)
        .bind(period.professional_id.map(|p| p.to_string()))
        .bind(period.period_start)
        .bind(period.period_end)
        .bind(period.total_gross)
        .bind(period.total_commission)
        .bind(period.total_advances)
        .bind(period.total_adjustments)
        .bind(period.total_net)
        .bind(period.items_count)
        .bind(period.status.as_str())
        .bind(&period.notes)
        .bind(period.created_at)
        .bind(period.updated_at)
        .execute(&self.pool)
        .await;

        match inserted {
            Ok(_) => Ok(period.clone()),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                let professional_id = period
                    .professional_id
                    .ok_or_else(|| AppError::internal("Duplicate commission period id"))?;
                debug!(
                    tenant_id = %period.tenant_id,
                    professional_id = %professional_id,
                    "Open period already exists; returning it"
                );
                self.find_open_by_professional(period.tenant_id, professional_id)
                    .await?
                    .ok_or_else(|| AppError::internal("Open period vanished after unique violation"))
            }
            Err(e) => Err(AppError::Internal(format!("Failed to create commission period: {}", e))),
        }
    }

    async fn find_by_id(&self, tenant_id: Uuid, id: Uuid) -> Result<Option<CommissionPeriod>> {
        let sql = format!(
            "SELECT {} FROM commission_periods WHERE tenant_id = ? AND id = ?",
            PERIOD_COLUMNS
        );
        let row = sqlx::query_as::<_, PeriodRow>(&sql)
            .bind(tenant_id.to_string())
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to fetch commission period: {}", e)))?;

        row.map(CommissionPeriod::try_from).transpose()
    }

    async fn find_open_by_professional(&self, tenant_id: Uuid, professional_id: Uuid) -> Result<Option<CommissionPeriod>> {
        let sql = format!(
            r#"
            SELECT {} FROM commission_periods
            WHERE tenant_id = ? AND professional_id = ? AND status = 'ABERTO'
            "#,
            PERIOD_COLUMNS
        );
        let row = sqlx::query_as::<_, PeriodRow>(&sql)
            .bind(tenant_id.to_string())
            .bind(professional_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to fetch open period: {}", e)))?;

        row.map(CommissionPeriod::try_from).transpose()
    }

    async fn list(&self, tenant_id: Uuid, filter: &PeriodFilter) -> Result<Vec<CommissionPeriod>> {
        let mut builder: QueryBuilder<MySql> = QueryBuilder::new(format!(
            "SELECT {} FROM commission_periods WHERE tenant_id = ",
            PERIOD_COLUMNS
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
        if let Some(month) = &filter.reference_month {
            builder.push(" AND reference_month = ").push_bind(month.clone());
        }
        builder.push(" ORDER BY period_start DESC, created_at DESC");

        let rows = builder
            .build_query_as::<PeriodRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to list commission periods: {}", e)))?;

        rows.into_iter().map(|row| row.try_into()).collect()
    }

    async fn update_totals(&self, period: &CommissionPeriod) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE commission_periods
            SET total_gross = ?, total_commission = ?, total_adjustments = ?, total_net = ?,
                items_count = ?, notes = ?, updated_at = ?
            WHERE tenant_id = ? AND id = ? AND status = 'ABERTO'
            "#,
        )
        .bind(period.total_gross)
        .bind(period.total_commission)
        .bind(period.total_adjustments)
        .bind(period.total_net)
        .bind(period.items_count)
        .bind(&period.notes)
        .bind(period.updated_at)
        .bind(period.tenant_id.to_string())
        .bind(period.id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to update period totals: {}", e)))?;

        Ok(result.rows_affected() > 0)
    }

    async fn summary(&self, period: &CommissionPeriod) -> Result<CommissionSummary> {
        let (total_gross, total_commission, items_count): (Decimal, Decimal, i64) = sqlx::query_as(
            r#"
            SELECT COALESCE(SUM(gross_value), 0),
                   COALESCE(SUM(commission_value), 0),
                   COUNT(*)
            FROM commission_items
            WHERE tenant_id = ?
              AND (period_id = ?
                   OR (professional_id = ? AND status = 'PENDENTE'
                       AND reference_date BETWEEN ? AND ?))
            "#,
        )
        .bind(period.tenant_id.to_string())
        .bind(period.id.to_string())
        .bind(period.professional_id.map(|p| p.to_string()))
        .bind(period.period_start)
        .bind(period.period_end)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to summarize period: {}", e)))?;

        Ok(CommissionSummary {
            total_gross,
            total_commission,
            items_count,
        })
    }

    async fn close(&self, tenant_id: Uuid, command: ClosePeriodCommand) -> Result<ClosedPeriod> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to start transaction: {}", e)))?;

        let sql = format!(
            "SELECT {} FROM commission_periods WHERE tenant_id = ? AND id = ? FOR UPDATE",
            PERIOD_COLUMNS
        );
        let mut period: CommissionPeriod = sqlx::query_as::<_, PeriodRow>(&sql)
            .bind(tenant_id.to_string())
            .bind(command.period_id.to_string())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to lock commission period: {}", e)))?
            .ok_or_else(|| AppError::PeriodNotFound(command.period_id.to_string()))?
            .try_into()?;

        if !period.can_close() {
            return Err(AppError::PeriodCannotClose(period.status.to_string()));
        }

        let mut deducted = Vec::with_capacity(command.advances.len());
        for mut advance in command.advances {
            if period.professional_id.is_some_and(|p| p != advance.professional_id)
                || advance.mark_deducted(period.id, command.closed_at).is_err()
            {
                warn!(
                    period_id = %period.id,
                    advance_id = %advance.id,
                    "Advance not deductible from this period; skipped"
                );
                continue;
            }

            let result = sqlx::query(
                r#"
                UPDATE advances
                SET status = 'DEDUCTED', deduction_period_id = ?, deducted_at = ?, updated_at = ?
                WHERE tenant_id = ? AND id = ? AND status = 'APPROVED'
                "#,
            )
            .bind(period.id.to_string())
            .bind(command.closed_at)
            .bind(command.closed_at)
            .bind(tenant_id.to_string())
            .bind(advance.id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to deduct advance: {}", e)))?;

            if result.rows_affected() == 0 {
                warn!(
                    period_id = %period.id,
                    advance_id = %advance.id,
                    "Advance no longer APPROVED; skipped"
                );
                continue;
            }
            deducted.push(advance);
        }

        let mut savepoint = Acquire::begin(&mut tx)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to open item sweep savepoint: {}", e)))?;
        let sweep = match Self::sweep_items(&mut savepoint, &period, command.closed_at).await {
            Ok(sweep) => {
                savepoint
                    .commit()
                    .await
                    .map_err(|e| AppError::Internal(format!("Failed to release item sweep savepoint: {}", e)))?;
                Some(sweep)
            }
            Err(e) => {
                warn!(
                    period_id = %period.id,
                    error = %e,
                    "Item sweep failed; closing on stored totals without binding items"
                );
                savepoint
                    .rollback()
                    .await
                    .map_err(|e| AppError::Internal(format!("Failed to roll back item sweep: {}", e)))?;
                None
            }
        };
        let (summary, items_processed) = match sweep {
            Some((summary, processed)) => (Some(summary), processed),
            None => (None, 0),
        };

        period.apply_close(summary.as_ref(), &deducted, command.closed_by, command.closed_at)?;

        let result = sqlx::query(
            r#"
            UPDATE commission_periods
            SET status = 'FECHADO', total_gross = ?, total_commission = ?, total_advances = ?,
                total_net = ?, items_count = ?, closed_by = ?, closed_at = ?, updated_at = ?
            WHERE tenant_id = ? AND id = ? AND status = 'ABERTO'
            "#,
        )
        .bind(period.total_gross)
        .bind(period.total_commission)
        .bind(period.total_advances)
        .bind(period.total_net)
        .bind(period.items_count)
        .bind(command.closed_by.to_string())
        .bind(command.closed_at)
        .bind(command.closed_at)
        .bind(tenant_id.to_string())
        .bind(period.id.to_string())
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to close commission period: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(AppError::PeriodCannotClose(PeriodStatus::Fechado.to_string()));
        }

        tx.commit()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to commit transaction: {}", e)))?;

        Ok(ClosedPeriod {
            period,
            deducted,
            items_processed,
        })
    }

    async fn link_payable(&self, tenant_id: Uuid, id: Uuid, payable_id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE commission_periods
            SET conta_pagar_id = ?, updated_at = ?
            WHERE tenant_id = ? AND id = ? AND conta_pagar_id IS NULL
            "#,
        )
        .bind(payable_id.to_string())
        .bind(Utc::now())
        .bind(tenant_id.to_string())
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to link payable: {}", e)))?;

        Ok(result.rows_affected() > 0)
    }

    async fn mark_as_paid(&self, tenant_id: Uuid, id: Uuid, paid_by: Uuid, at: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE commission_periods
            SET status = 'PAGO', paid_by = ?, paid_at = ?, updated_at = ?
            WHERE tenant_id = ? AND id = ? AND status = 'FECHADO'
            "#,
        )
        .bind(paid_by.to_string())
        .bind(at)
        .bind(at)
        .bind(tenant_id.to_string())
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to mark period as paid: {}", e)))?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, tenant_id: Uuid, id: Uuid) -> Result<bool> {
        let result =
            sqlx::query("DELETE FROM commission_periods WHERE tenant_id = ? AND id = ? AND status = 'ABERTO'")
                .bind(tenant_id.to_string())
                .bind(id.to_string())
                .execute(&self.pool)
                .await
                .map_err(|e| AppError::Internal(format!("Failed to delete commission period: {}", e)))?;

        Ok(result.rows_affected() > 0)
    }
}

/// Database row representation for commission_periods table
#[derive(sqlx::FromRow)]
struct PeriodRow {
    id: String,
    tenant_id: String,
    unit_id: Option<String>,
    reference_month: String,
    professional_id: Option<String>,
    period_start: NaiveDate,
    period_end: NaiveDate,
    total_gross: Decimal,
    total_commission: Decimal,
    total_advances: Decimal,
    total_adjustments: Decimal,
    total_net: Decimal,
    items_count: i64,
    status: String,
    conta_pagar_id: Option<String>,
    closed_by: Option<String>,
    closed_at: Option<DateTime<Utc>>,
    paid_by: Option<String>,
    paid_at: Option<DateTime<Utc>>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PeriodRow> for CommissionPeriod {
    type Error = AppError;

    fn try_from(row: PeriodRow) -> Result<Self> {
        let status = row
            .status
            .parse::<PeriodStatus>()
            .map_err(|_| AppError::Internal(format!("Invalid period status: {}", row.status)))?;

        Ok(CommissionPeriod {
            id: stored_id(&row.id)?,
            tenant_id: stored_id(&row.tenant_id)?,
            unit_id: row.unit_id.as_deref().map(stored_id).transpose()?,
            reference_month: row.reference_month,
            professional_id: row.professional_id.as_deref().map(stored_id).transpose()?,
            period_start: row.period_start,
            period_end: row.period_end,
            total_gross: row.total_gross,
            total_commission: row.total_commission,
            total_advances: row.total_advances,
            total_adjustments: row.total_adjustments,
            total_net: row.total_net,
            items_count: row.items_count,
            status,
            conta_pagar_id: row.conta_pagar_id.as_deref().map(stored_id).transpose()?,
            closed_by: row.closed_by.as_deref().map(stored_id).transpose()?,
            closed_at: row.closed_at,
            paid_by: row.paid_by.as_deref().map(stored_id).transpose()?,
            paid_at: row.paid_at,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
