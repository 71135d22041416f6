//! API-facing user models. The password hash never leaves the database layer.

use crate::{db::models::users::UserDBResponse, types::UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub spoken_language: String,
    pub learning_language: String,
    pub created_at: DateTime<Utc>,
}

impl From<UserDBResponse> for UserResponse {
    fn from(user: UserDBResponse) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            spoken_language: user.spoken_language,
            learning_language: user.learning_language,
            created_at: user.created_at,
        }
    }
}
