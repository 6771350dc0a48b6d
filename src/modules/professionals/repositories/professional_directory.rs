use async_trait::async_trait;
use sqlx::MySqlPool;
use uuid::Uuid;

use crate::core::validation::stored_id;
use crate::core::{AppError, Result};
use crate::modules::professionals::models::Professional;

/// Name lookup owned by the scheduling/staff subsystem
#[async_trait]
pub trait ProfessionalDirectory: Send + Sync {
    async fn find_by_id(&self, tenant_id: Uuid, id: Uuid) -> Result<Option<Professional>>;
}

pub struct MySqlProfessionalDirectory {
    pool: MySqlPool,
}

impl MySqlProfessionalDirectory {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfessionalDirectory for MySqlProfessionalDirectory {
    async fn find_by_id(&self, tenant_id: Uuid, id: Uuid) -> Result<Option<Professional>> {
        let row = sqlx::query_as::<_, ProfessionalRow>(
            "SELECT id, tenant_id, name FROM professionals WHERE tenant_id = ? AND id = ?",
        )
        .bind(tenant_id.to_string())
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::collaborator(format!("Failed to look up professional: {}", e)))?;

        row.map(Professional::try_from).transpose()
    }
}

#[derive(sqlx::FromRow)]
struct ProfessionalRow {
    id: String,
    tenant_id: String,
    name: String,
}

impl TryFrom<ProfessionalRow> for Professional {
    type Error = AppError;

    fn try_from(row: ProfessionalRow) -> Result<Self> {
        Ok(Professional {
            id: stored_id(&row.id)?,
            tenant_id: stored_id(&row.tenant_id)?,
            name: row.name,
        })
    }
}
