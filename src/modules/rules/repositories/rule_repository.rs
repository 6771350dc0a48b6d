// Commission rule store
//
// Implements:
// - Rule CRUD scoped by tenant
// - Deactivation (soft) and guarded hard delete
// - Effective-rule queries by unit, global, or any scope, ordered by precedence

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::MySqlPool;
use uuid::Uuid;

use crate::core::validation::stored_id;
use crate::core::{AppError, Result};
use crate::modules::rules::models::{CalculationBase, CommissionRule, CommissionType};

#[async_trait]
pub trait RuleRepository: Send + Sync {
    async fn create(&self, rule: &CommissionRule) -> Result<CommissionRule>;

    async fn find_by_id(&self, tenant_id: Uuid, id: Uuid) -> Result<Option<CommissionRule>>;

    async fn update(&self, rule: &CommissionRule) -> Result<CommissionRule>;

    /// Hard delete; returns false when the rule does not exist
    async fn delete(&self, tenant_id: Uuid, id: Uuid) -> Result<bool>;

    async fn deactivate(&self, tenant_id: Uuid, id: Uuid) -> Result<bool>;

    async fn list_active(&self, tenant_id: Uuid) -> Result<Vec<CommissionRule>>;

    /// Whether any commission item references the rule
    async fn is_referenced(&self, tenant_id: Uuid, id: Uuid) -> Result<bool>;

    /// Active rules effective on `date` at any scope, unit-scoped first
    async fn find_effective(&self, tenant_id: Uuid, date: NaiveDate) -> Result<Vec<CommissionRule>>;

    /// Active rules scoped to `unit_id` effective on `date`, by precedence
    async fn find_effective_by_unit(
        &self,
        tenant_id: Uuid,
        unit_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<CommissionRule>>;

    /// Active tenant-wide rules effective on `date`, by precedence
    async fn find_effective_global(&self, tenant_id: Uuid, date: NaiveDate) -> Result<Vec<CommissionRule>>;
}

const RULE_COLUMNS: &str = r#"
    id, tenant_id, unit_id, name, commission_type, default_rate, min_amount,
    max_amount, calculation_base, effective_from, effective_to, priority,
    is_active, created_at, updated_at
"#;

// Precedence: explicit priority ascending, absent priority last, newest first
const PRECEDENCE_ORDER: &str = "ORDER BY (priority IS NULL) ASC, priority ASC, created_at DESC";

const EFFECTIVE_FILTER: &str = r#"
    tenant_id = ? AND is_active = TRUE
    AND effective_from <= ?
    AND (effective_to IS NULL OR effective_to >= ?)
"#;

pub struct MySqlRuleRepository {
    pool: MySqlPool,
}

impl MySqlRuleRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    async fn fetch_rules(&self, sql: &str, binds: RuleQueryBinds) -> Result<Vec<CommissionRule>> {
        let mut query = sqlx::query_as::<_, CommissionRuleRow>(sql).bind(binds.tenant_id.to_string());
        if let Some(date) = binds.date {
            query = query.bind(date).bind(date);
        }
        if let Some(unit_id) = binds.unit_id {
            query = query.bind(unit_id.to_string());
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to fetch commission rules: {}", e)))?;

        rows.into_iter().map(|row| row.try_into()).collect()
    }
}

struct RuleQueryBinds {
    tenant_id: Uuid,
    date: Option<NaiveDate>,
    unit_id: Option<Uuid>,
}

#[async_trait]
impl RuleRepository for MySqlRuleRepository {
    async fn create(&self, rule: &CommissionRule) -> Result<CommissionRule> {
        sqlx::query(
            r#"
            INSERT INTO commission_rules (
                id, tenant_id, unit_id, name, commission_type, default_rate,
                min_amount, max_amount, calculation_base, effective_from,
                effective_to, priority, is_active, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(rule.id.to_string())
        .bind(rule.tenant_id.to_string())
        .bind(rule.unit_id.map(|u| u.to_string()))
        .bind(&rule.name)
        .bind(rule.commission_type.as_str())
        .bind(rule.default_rate)
        .bind(rule.min_amount)
        .bind(rule.max_amount)
        .bind(rule.calculation_base.as_str())
        .bind(rule.effective_from)
        .bind(rule.effective_to)
        .bind(rule.priority)
        .bind(rule.is_active)
        .bind(rule.created_at)
        .bind(rule.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to create commission rule: {}", e)))?;

        Ok(rule.clone())
    }

    async fn find_by_id(&self, tenant_id: Uuid, id: Uuid) -> Result<Option<CommissionRule>> {
        let sql = format!(
            "SELECT {} FROM commission_rules WHERE tenant_id = ? AND id = ?",
            RULE_COLUMNS
        );
        let row = sqlx::query_as::<_, CommissionRuleRow>(&sql)
            .bind(tenant_id.to_string())
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to fetch commission rule: {}", e)))?;

        row.map(CommissionRule::try_from).transpose()
    }

    async fn update(&self, rule: &CommissionRule) -> Result<CommissionRule> {
        let rows_affected = sqlx::query(
            r#"
            UPDATE commission_rules
            SET
                name = ?,
                commission_type = ?,
                default_rate = ?,
                min_amount = ?,
                max_amount = ?,
                calculation_base = ?,
                effective_from = ?,
                effective_to = ?,
                priority = ?,
                is_active = ?,
                updated_at = ?
            WHERE tenant_id = ? AND id = ?
            "#,
        )
        .bind(&rule.name)
        .bind(rule.commission_type.as_str())
        .bind(rule.default_rate)
        .bind(rule.min_amount)
        .bind(rule.max_amount)
        .bind(rule.calculation_base.as_str())
        .bind(rule.effective_from)
        .bind(rule.effective_to)
        .bind(rule.priority)
        .bind(rule.is_active)
        .bind(rule.updated_at)
        .bind(rule.tenant_id.to_string())
        .bind(rule.id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to update commission rule: {}", e)))?
        .rows_affected();

        if rows_affected == 0 {
            return Err(AppError::RuleNotFound(rule.id.to_string()));
        }

        Ok(rule.clone())
    }

    async fn delete(&self, tenant_id: Uuid, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM commission_rules WHERE tenant_id = ? AND id = ?")
            .bind(tenant_id.to_string())
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if let Some(db_err) = e.as_database_error() {
                    if db_err.is_foreign_key_violation() {
                        return AppError::RuleInUse(id.to_string());
                    }
                }
                AppError::Internal(format!("Failed to delete commission rule: {}", e))
            })?;

        Ok(result.rows_affected() > 0)
    }

    async fn deactivate(&self, tenant_id: Uuid, id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE commission_rules SET is_active = FALSE, updated_at = ? WHERE tenant_id = ? AND id = ?",
        )
        .bind(Utc::now())
        .bind(tenant_id.to_string())
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to deactivate commission rule: {}", e)))?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_active(&self, tenant_id: Uuid) -> Result<Vec<CommissionRule>> {
        let sql = format!(
            "SELECT {} FROM commission_rules WHERE tenant_id = ? AND is_active = TRUE ORDER BY name ASC",
            RULE_COLUMNS
        );
        self.fetch_rules(
            &sql,
            RuleQueryBinds {
                tenant_id,
                date: None,
                unit_id: None,
            },
        )
        .await
    }

    async fn is_referenced(&self, tenant_id: Uuid, id: Uuid) -> Result<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM commission_items WHERE tenant_id = ? AND rule_id = ?",
        )
        .bind(tenant_id.to_string())
        .bind(id.to_string())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to check rule references: {}", e)))?;

        Ok(count > 0)
    }

    async fn find_effective(&self, tenant_id: Uuid, date: NaiveDate) -> Result<Vec<CommissionRule>> {
        let sql = format!(
            "SELECT {} FROM commission_rules WHERE {} ORDER BY (unit_id IS NULL) ASC, (priority IS NULL) ASC, priority ASC, created_at DESC",
            RULE_COLUMNS, EFFECTIVE_FILTER
        );
        self.fetch_rules(
            &sql,
            RuleQueryBinds {
                tenant_id,
                date: Some(date),
                unit_id: None,
            },
        )
        .await
    }

    async fn find_effective_by_unit(
        &self,
        tenant_id: Uuid,
        unit_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<CommissionRule>> {
        let sql = format!(
            "SELECT {} FROM commission_rules WHERE {} AND unit_id = ? {}",
            RULE_COLUMNS, EFFECTIVE_FILTER, PRECEDENCE_ORDER
        );
        self.fetch_rules(
            &sql,
            RuleQueryBinds {
                tenant_id,
                date: Some(date),
                unit_id: Some(unit_id),
            },
        )
        .await
    }

    async fn find_effective_global(&self, tenant_id: Uuid, date: NaiveDate) -> Result<Vec<CommissionRule>> {
        let sql = format!(
            "SELECT {} FROM commission_rules WHERE {} AND unit_id IS NULL {}",
            RULE_COLUMNS, EFFECTIVE_FILTER, PRECEDENCE_ORDER
        );
        self.fetch_rules(
            &sql,
            RuleQueryBinds {
                tenant_id,
                date: Some(date),
                unit_id: None,
            },
        )
        .await
    }
}

/// Database row representation for commission_rules table
#[derive(sqlx::FromRow)]
struct CommissionRuleRow {
    id: String,
    tenant_id: String,
    unit_id: Option<String>,
    name: String,
    commission_type: String,
    default_rate: Decimal,
    min_amount: Option<Decimal>,
    max_amount: Option<Decimal>,
    calculation_base: String,
    effective_from: NaiveDate,
    effective_to: Option<NaiveDate>,
    priority: Option<i32>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<CommissionRuleRow> for CommissionRule {
    type Error = AppError;

    fn try_from(row: CommissionRuleRow) -> Result<Self> {
        Ok(CommissionRule {
            id: stored_id(&row.id)?,
            tenant_id: stored_id(&row.tenant_id)?,
            unit_id: row.unit_id.as_deref().map(stored_id).transpose()?,
            name: row.name,
            commission_type: row.commission_type.parse::<CommissionType>().map_err(|_| {
                AppError::Internal(format!("Invalid commission type in storage: {}", row.commission_type))
            })?,
            default_rate: row.default_rate,
            min_amount: row.min_amount,
            max_amount: row.max_amount,
            calculation_base: row.calculation_base.parse::<CalculationBase>().map_err(|_| {
                AppError::Internal(format!("Invalid calculation base in storage: {}", row.calculation_base))
            })?,
            effective_from: row.effective_from,
            effective_to: row.effective_to,
            priority: row.priority,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
