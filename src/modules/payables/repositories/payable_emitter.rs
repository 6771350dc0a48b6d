// Accounts-payable port
//
// The financial subsystem owns `contas_pagar`; this adapter only inserts
// obligations and looks them up by origin so retries never duplicate them.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::MySqlPool;
use tracing::debug;
use uuid::Uuid;

use crate::core::validation::stored_id;
use crate::core::{AppError, Result};
use crate::modules::payables::models::{EmittedPayable, PayableRequest};

#[async_trait]
pub trait PayableEmitter: Send + Sync {
    /// Creates the payable, or returns the one already emitted for the same origin
    async fn create(&self, request: &PayableRequest) -> Result<EmittedPayable>;
}

pub struct MySqlPayableEmitter {
    pool: MySqlPool,
}

impl MySqlPayableEmitter {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    async fn find_by_origin(&self, request: &PayableRequest) -> Result<Option<EmittedPayable>> {
        let row = sqlx::query_as::<_, PayableRow>(
            r#"
            SELECT id, description, amount, due_date, created_at
            FROM contas_pagar
            WHERE tenant_id = ? AND origin_type = ? AND origin_id = ?
            "#,
        )
        .bind(request.tenant_id.to_string())
        .bind(&request.origin_type)
        .bind(request.origin_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::collaborator(format!("Failed to look up payable: {}", e)))?;

        row.map(EmittedPayable::try_from).transpose()
    }
}

#[async_trait]
impl PayableEmitter for MySqlPayableEmitter {
    async fn create(&self, request: &PayableRequest) -> Result<EmittedPayable> {
        request.validate()?;

        if let Some(existing) = self.find_by_origin(request).await? {
            debug!(
                tenant_id = %request.tenant_id,
                origin_id = %request.origin_id,
                payable_id = %existing.id,
                "Payable already emitted for origin"
            );
            return Ok(existing);
        }

        let id = Uuid::new_v4();
        let now = Utc::now();
        let inserted = sqlx::query(
            r#"
            INSERT INTO contas_pagar (
                id, tenant_id, unit_id, description, category, supplier, amount,
                due_date, cost_type, recurring, observations, origin_type, origin_id,
                status, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 'PENDENTE', ?, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(request.tenant_id.to_string())
        .bind(request.unit_id.map(|u| u.to_string()))
        .bind(&request.description)
        .bind(&request.category)
        .bind(&request.supplier)
        .bind(request.amount)
        .bind(request.due_date)
        .bind(request.cost_type.as_str())
        .bind(request.recurring)
        .bind(&request.observations)
        .bind(&request.origin_type)
        .bind(request.origin_id.to_string())
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await;

        match inserted {
            Ok(_) => Ok(EmittedPayable {
                id,
                description: request.description.clone(),
                amount: request.amount,
                due_date: request.due_date,
                created_at: now,
            }),
            // A concurrent emission for the same origin won
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => self
                .find_by_origin(request)
                .await?
                .ok_or_else(|| AppError::collaborator("Payable vanished after unique violation")),
            Err(e) => Err(AppError::collaborator(format!("Failed to create payable: {}", e))),
        }
    }
}

#[derive(sqlx::FromRow)]
struct PayableRow {
    id: String,
    description: String,
    amount: Decimal,
    due_date: NaiveDate,
    created_at: DateTime<Utc>,
}

impl TryFrom<PayableRow> for EmittedPayable {
    type Error = AppError;

    fn try_from(row: PayableRow) -> Result<Self> {
        Ok(EmittedPayable {
            id: stored_id(&row.id)?,
            description: row.description,
            amount: row.amount,
            due_date: row.due_date,
            created_at: row.created_at,
        })
    }
}
