//! Database models for learner accounts.

use crate::types::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Request to create a user row. The password is already hashed by the
/// time it reaches the database layer.
#[derive(Debug, Clone)]
pub struct UserCreateDBRequest {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub spoken_language: String,
    pub learning_language: String,
}

/// Partial update of a user row. `None` fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct UserUpdateDBRequest {
    pub name: Option<String>,
    pub password_hash: Option<String>,
    pub spoken_language: Option<String>,
    pub learning_language: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserDBResponse {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub spoken_language: String,
    pub learning_language: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
