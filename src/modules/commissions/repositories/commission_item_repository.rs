// Commission item store
//
// Implements:
// - Single and all-or-nothing batch inserts
// - Guarded writes: descriptive updates, deletes and processing only match
//   PENDENTE rows, so a processed item can never be altered
// - Bulk assignment of a professional's pending items to a period
// - Read-only aggregations for reporting (date range, per professional,
//   per service)

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::mysql::MySqlArguments;
use sqlx::query::Query;
use sqlx::{MySql, MySqlPool, QueryBuilder, Transaction};
use uuid::Uuid;

use crate::core::validation::stored_id;
use crate::core::{AppError, Result};
use crate::modules::commissions::models::{
    CommissionItem, CommissionItemFilter, CommissionItemStatus, CommissionSource,
    CommissionSummary, ProfessionalCommissionSummary, ServiceCommissionSummary,
};
use crate::modules::rules::models::CommissionType;

#[async_trait]
pub trait CommissionItemRepository: Send + Sync {
    async fn create(&self, item: &CommissionItem) -> Result<CommissionItem>;

    /// Inserts every item or none
    async fn create_batch(&self, items: &[CommissionItem]) -> Result<Vec<CommissionItem>>;

    async fn find_by_id(&self, tenant_id: Uuid, id: Uuid) -> Result<Option<CommissionItem>>;

    async fn find_by_command_item(&self, tenant_id: Uuid, command_item_id: Uuid) -> Result<Option<CommissionItem>>;

    async fn list(&self, tenant_id: Uuid, filter: &CommissionItemFilter) -> Result<Vec<CommissionItem>>;

    /// Writes descriptive fields only, and only while PENDENTE
    async fn update(&self, item: &CommissionItem) -> Result<bool>;

    /// Deletes only while PENDENTE; false when nothing matched
    async fn delete(&self, tenant_id: Uuid, id: Uuid) -> Result<bool>;

    /// PENDENTE -> PROCESSADO for one item
    async fn process(&self, tenant_id: Uuid, id: Uuid, period_id: Uuid, at: DateTime<Utc>) -> Result<bool>;

    /// Moves the professional's PENDENTE items dated within `[start, end]` to
    /// PROCESSADO under `period_id`. Already processed items are left alone.
    /// Returns how many items moved.
    async fn assign_to_period(
        &self,
        tenant_id: Uuid,
        professional_id: Uuid,
        period_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
        at: DateTime<Utc>,
    ) -> Result<u64>;

    async fn sum_by_date_range(
        &self,
        tenant_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
        professional_id: Option<Uuid>,
    ) -> Result<CommissionSummary>;

    async fn summary_by_professional(
        &self,
        tenant_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<ProfessionalCommissionSummary>>;

    async fn summary_by_service(
        &self,
        tenant_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<ServiceCommissionSummary>>;
}

const ITEM_COLUMNS: &str = r#"
    id, tenant_id, unit_id, professional_id, command_id, command_item_id,
    appointment_id, service_id, gross_value, commission_rate, commission_type,
    commission_value, commission_source, rule_id, reference_date, status,
    period_id, processed_at, created_at, updated_at
"#;

pub struct MySqlCommissionItemRepository {
    pool: MySqlPool,
}

impl MySqlCommissionItemRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    fn insert_query(item: &CommissionItem) -> Query<'_, MySql, MySqlArguments> {
        sqlx::query(
            r#"
            INSERT INTO commission_items (
                id, tenant_id, unit_id, professional_id, command_id, command_item_id,
                appointment_id, service_id, gross_value, commission_rate, commission_type,
                commission_value, commission_source, rule_id, reference_date, status,
                period_id, processed_at, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(item.id.to_string())
        .bind(item.tenant_id.to_string())
        .bind(item.unit_id.map(|u| u.to_string()))
        .bind(item.professional_id.to_string())
        .bind(item.command_id.map(|c| c.to_string()))
        .bind(item.command_item_id.map(|c| c.to_string()))
        .bind(item.appointment_id.map(|a| a.to_string()))
        .bind(item.service_id.map(|s| s.to_string()))
        .bind(item.gross_value)
        .bind(item.commission_rate)
        .bind(item.commission_type.as_str())
        .bind(item.commission_value)
        .bind(item.commission_source.as_str())
        .bind(item.rule_id.map(|r| r.to_string()))
        .bind(item.reference_date)
        .bind(item.status.as_str())
        .bind(item.period_id.map(|p| p.to_string()))
        .bind(item.processed_at)
        .bind(item.created_at)
        .bind(item.updated_at)
    }

    async fn insert_with_tx(&self, tx: &mut Transaction<'_, MySql>, item: &CommissionItem) -> Result<()> {
        Self::insert_query(item)
            .execute(&mut **tx)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to create commission item: {}", e)))?;
        Ok(())
    }
}

#[async_trait]
impl CommissionItemRepository for MySqlCommissionItemRepository {
    async fn create(&self, item: &CommissionItem) -> Result<CommissionItem> {
        Self::insert_query(item)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to create commission item: {}", e)))?;

        Ok(item.clone())
    }

    async fn create_batch(&self, items: &[CommissionItem]) -> Result<Vec<CommissionItem>> {
        if items.is_empty() {
            return Ok(Vec::new());
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to start transaction: {}", e)))?;

        for item in items {
            self.insert_with_tx(&mut tx, item).await?;
        }

        tx.commit()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to commit transaction: {}", e)))?;

        Ok(items.to_vec())
    }

    async fn find_by_id(&self, tenant_id: Uuid, id: Uuid) -> Result<Option<CommissionItem>> {
        let sql = format!(
            "SELECT {} FROM commission_items WHERE tenant_id = ? AND id = ?",
            ITEM_COLUMNS
        );
        let row = sqlx::query_as::<_, CommissionItemRow>(&sql)
            .bind(tenant_id.to_string())
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to fetch commission item: {}", e)))?;

        row.map(CommissionItem::try_from).transpose()
    }

    async fn find_by_command_item(&self, tenant_id: Uuid, command_item_id: Uuid) -> Result<Option<CommissionItem>> {
        let sql = format!(
            r#"
            SELECT {} FROM commission_items
            WHERE tenant_id = ? AND command_item_id = ?
            ORDER BY created_at DESC
            LIMIT 1
            "#,
            ITEM_COLUMNS
        );
        let row = sqlx::query_as::<_, CommissionItemRow>(&sql)
            .bind(tenant_id.to_string())
            .bind(command_item_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to fetch commission item: {}", e)))?;

        row.map(CommissionItem::try_from).transpose()
    }

    async fn list(&self, tenant_id: Uuid, filter: &CommissionItemFilter) -> Result<Vec<CommissionItem>> {
        let mut builder: QueryBuilder<MySql> = QueryBuilder::new(format!(
            "SELECT {} FROM commission_items WHERE tenant_id = ",
            ITEM_COLUMNS
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
        if let Some(period_id) = filter.period_id {
            builder.push(" AND period_id = ").push_bind(period_id.to_string());
        }
        if let Some(command_id) = filter.command_id {
            builder.push(" AND command_id = ").push_bind(command_id.to_string());
        }
        if let Some(from) = filter.from {
            builder.push(" AND reference_date >= ").push_bind(from);
        }
        if let Some(to) = filter.to {
            builder.push(" AND reference_date <= ").push_bind(to);
        }
        builder.push(" ORDER BY reference_date DESC, created_at DESC");

        let rows = builder
            .build_query_as::<CommissionItemRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to list commission items: {}", e)))?;

        rows.into_iter().map(|row| row.try_into()).collect()
    }

    async fn update(&self, item: &CommissionItem) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE commission_items
            SET reference_date = ?, service_id = ?, appointment_id = ?, updated_at = ?
            WHERE tenant_id = ? AND id = ? AND status = 'PENDENTE'
            "#,
        )
        .bind(item.reference_date)
        .bind(item.service_id.map(|s| s.to_string()))
        .bind(item.appointment_id.map(|a| a.to_string()))
        .bind(item.updated_at)
        .bind(item.tenant_id.to_string())
        .bind(item.id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to update commission item: {}", e)))?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, tenant_id: Uuid, id: Uuid) -> Result<bool> {
        let result =
            sqlx::query("DELETE FROM commission_items WHERE tenant_id = ? AND id = ? AND status = 'PENDENTE'")
                .bind(tenant_id.to_string())
                .bind(id.to_string())
                .execute(&self.pool)
                .await
                .map_err(|e| AppError::Internal(format!("Failed to delete commission item: {}", e)))?;

        Ok(result.rows_affected() > 0)
    }

    async fn process(&self, tenant_id: Uuid, id: Uuid, period_id: Uuid, at: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE commission_items
            SET status = 'PROCESSADO', period_id = ?, processed_at = ?, updated_at = ?
            WHERE tenant_id = ? AND id = ? AND status = 'PENDENTE'
            "#,
        )
        .bind(period_id.to_string())
        .bind(at)
        .bind(at)
        .bind(tenant_id.to_string())
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to process commission item: {}", e)))?;

        Ok(result.rows_affected() > 0)
    }

    async fn assign_to_period(
        &self,
        tenant_id: Uuid,
        professional_id: Uuid,
        period_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
        at: DateTime<Utc>,
    ) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE commission_items
            SET status = 'PROCESSADO', period_id = ?, processed_at = ?, updated_at = ?
            WHERE tenant_id = ? AND professional_id = ? AND status = 'PENDENTE'
              AND reference_date BETWEEN ? AND ?
            "#,
        )
        .bind(period_id.to_string())
        .bind(at)
        .bind(at)
        .bind(tenant_id.to_string())
        .bind(professional_id.to_string())
        .bind(start)
        .bind(end)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to assign commission items: {}", e)))?;

        Ok(result.rows_affected())
    }

    async fn sum_by_date_range(
        &self,
        tenant_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
        professional_id: Option<Uuid>,
    ) -> Result<CommissionSummary> {
        let mut builder: QueryBuilder<MySql> = QueryBuilder::new(
            r#"
            SELECT COALESCE(SUM(gross_value), 0) AS total_gross,
                   COALESCE(SUM(commission_value), 0) AS total_commission,
                   COUNT(*) AS items_count
            FROM commission_items WHERE tenant_id = "#,
        );
        builder.push_bind(tenant_id.to_string());
        builder.push(" AND reference_date >= ").push_bind(from);
        builder.push(" AND reference_date <= ").push_bind(to);
        if let Some(professional_id) = professional_id {
            builder.push(" AND professional_id = ").push_bind(professional_id.to_string());
        }

        let row = builder
            .build_query_as::<SummaryRow>()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to sum commission items: {}", e)))?;

        Ok(row.into())
    }

    async fn summary_by_professional(
        &self,
        tenant_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<ProfessionalCommissionSummary>> {
        let rows = sqlx::query_as::<_, GroupedSummaryRow>(
            r#"
            SELECT professional_id AS group_id,
                   COALESCE(SUM(gross_value), 0) AS total_gross,
                   COALESCE(SUM(commission_value), 0) AS total_commission,
                   COUNT(*) AS items_count
            FROM commission_items
            WHERE tenant_id = ? AND reference_date BETWEEN ? AND ?
            GROUP BY professional_id
            ORDER BY total_commission DESC
            "#,
        )
        .bind(tenant_id.to_string())
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to summarize commissions by professional: {}", e)))?;

        rows.into_iter()
            .map(|row| {
                let professional_id = row
                    .group_id
                    .as_deref()
                    .map(stored_id)
                    .transpose()?
                    .ok_or_else(|| AppError::internal("Commission item without professional"))?;
                Ok(ProfessionalCommissionSummary {
                    professional_id,
                    summary: row.summary(),
                })
            })
            .collect()
    }

    async fn summary_by_service(
        &self,
        tenant_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<ServiceCommissionSummary>> {
        let rows = sqlx::query_as::<_, GroupedSummaryRow>(
            r#"
            SELECT service_id AS group_id,
                   COALESCE(SUM(gross_value), 0) AS total_gross,
                   COALESCE(SUM(commission_value), 0) AS total_commission,
                   COUNT(*) AS items_count
            FROM commission_items
            WHERE tenant_id = ? AND reference_date BETWEEN ? AND ?
            GROUP BY service_id
            ORDER BY total_commission DESC
            "#,
        )
        .bind(tenant_id.to_string())
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to summarize commissions by service: {}", e)))?;

        rows.into_iter()
            .map(|row| {
                Ok(ServiceCommissionSummary {
                    service_id: row.group_id.as_deref().map(stored_id).transpose()?,
                    summary: row.summary(),
                })
            })
            .collect()
    }
}

/// Database row representation for commission_items table
#[derive(sqlx::FromRow)]
struct CommissionItemRow {
    id: String,
    tenant_id: String,
    unit_id: Option<String>,
    professional_id: String,
    command_id: Option<String>,
    command_item_id: Option<String>,
    appointment_id: Option<String>,
    service_id: Option<String>,
    gross_value: Decimal,
    commission_rate: Decimal,
    commission_type: String,
    commission_value: Decimal,
    commission_source: String,
    rule_id: Option<String>,
    reference_date: NaiveDate,
    status: String,
    period_id: Option<String>,
    processed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<CommissionItemRow> for CommissionItem {
    type Error = AppError;

    fn try_from(row: CommissionItemRow) -> Result<Self> {
        let commission_type = row
            .commission_type
            .parse::<CommissionType>()
            .map_err(|_| AppError::Internal(format!("Invalid commission type: {}", row.commission_type)))?;
        let commission_source = row
            .commission_source
            .parse::<CommissionSource>()
            .map_err(|_| AppError::Internal(format!("Invalid commission source: {}", row.commission_source)))?;
        let status = row
            .status
            .parse::<CommissionItemStatus>()
            .map_err(|_| AppError::Internal(format!("Invalid commission item status: {}", row.status)))?;

        Ok(CommissionItem {
            id: stored_id(&row.id)?,
            tenant_id: stored_id(&row.tenant_id)?,
            unit_id: row.unit_id.as_deref().map(stored_id).transpose()?,
            professional_id: stored_id(&row.professional_id)?,
            command_id: row.command_id.as_deref().map(stored_id).transpose()?,
            command_item_id: row.command_item_id.as_deref().map(stored_id).transpose()?,
            appointment_id: row.appointment_id.as_deref().map(stored_id).transpose()?,
            service_id: row.service_id.as_deref().map(stored_id).transpose()?,
            gross_value: row.gross_value,
            commission_rate: row.commission_rate,
            commission_type,
            commission_value: row.commission_value,
            commission_source,
            rule_id: row.rule_id.as_deref().map(stored_id).transpose()?,
            reference_date: row.reference_date,
            status,
            period_id: row.period_id.as_deref().map(stored_id).transpose()?,
            processed_at: row.processed_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct SummaryRow {
    total_gross: Decimal,
    total_commission: Decimal,
    items_count: i64,
}

impl From<SummaryRow> for CommissionSummary {
    fn from(row: SummaryRow) -> Self {
        CommissionSummary {
            total_gross: row.total_gross,
            total_commission: row.total_commission,
            items_count: row.items_count,
        }
    }
}

#[derive(sqlx::FromRow)]
struct GroupedSummaryRow {
    group_id: Option<String>,
    total_gross: Decimal,
    total_commission: Decimal,
    items_count: i64,
}

impl GroupedSummaryRow {
    fn summary(&self) -> CommissionSummary {
        CommissionSummary {
            total_gross: self.total_gross,
            total_commission: self.total_commission,
            items_count: self.items_count,
        }
    }
}
