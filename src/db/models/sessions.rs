//! Database models for server-side admin session records.

use crate::types::{AdminId, SessionId};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, Clone)]
pub struct AdminSessionCreateDBRequest {
    pub admin_id: AdminId,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct AdminSessionDBResponse {
    pub id: SessionId,
    pub admin_id: AdminId,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl AdminSessionDBResponse {
    /// Whether the server-side record has outlived its expiry.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}
