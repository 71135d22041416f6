//! API-facing admin models.

use crate::{db::models::admins::AdminDBResponse, types::AdminId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AdminResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: AdminId,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl From<AdminDBResponse> for AdminResponse {
    fn from(admin: AdminDBResponse) -> Self {
        Self {
            id: admin.id,
            name: admin.name,
            email: admin.email,
            created_at: admin.created_at,
        }
    }
}
