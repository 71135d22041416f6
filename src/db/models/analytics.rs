//! Database model for append-only analytics events.

use crate::types::UserId;

#[derive(Debug, Clone)]
pub struct AnalyticsEventCreateDBRequest {
    pub event_type: String,
    pub event_name: String,
    pub page: String,
    pub user_id: Option<UserId>,
    pub session_id: String,
    pub properties: serde_json::Value,
}
