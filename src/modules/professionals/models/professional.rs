use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Read-only view of a professional, as needed for payable descriptions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Professional {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
}
