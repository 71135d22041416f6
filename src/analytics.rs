//! Fire-and-forget page-view analytics.
//!
//! The access gate emits through the [`AnalyticsSink`] trait object held in
//! application state. The Postgres sink spawns the insert and logs
//! failures, so recording a view can never block or fail the request that
//! triggered it. Tests swap in a recording sink.

use sqlx::PgPool;
use tracing::warn;

use crate::{
    db::{handlers::AnalyticsEvents, models::analytics::AnalyticsEventCreateDBRequest},
    types::UserId,
};

/// A single page view, as observed by the access gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageView {
    pub page: String,
    pub user_id: Option<UserId>,
    pub session_id: String,
}

/// Destination for page-view events. Emission is infallible by contract:
/// implementations deal with their own failures.
pub trait AnalyticsSink: Send + Sync {
    fn emit(&self, event: PageView);
}

/// Persists page views to the `analytics_events` table on a spawned task.
pub struct PgAnalyticsSink {
    db: PgPool,
}

impl PgAnalyticsSink {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

impl AnalyticsSink for PgAnalyticsSink {
    fn emit(&self, event: PageView) {
        let db = self.db.clone();
        tokio::spawn(async move {
            let mut conn = match db.acquire().await {
                Ok(conn) => conn,
                Err(e) => {
                    warn!("Dropping page-view event for {}: {e}", event.page);
                    return;
                }
            };

            let mut repo = AnalyticsEvents::new(&mut conn);
            let request = AnalyticsEventCreateDBRequest {
                event_type: "page_view".to_string(),
                event_name: "page_view".to_string(),
                page: event.page.clone(),
                user_id: event.user_id,
                session_id: event.session_id,
                properties: serde_json::json!({}),
            };

            if let Err(e) = repo.insert(&request).await {
                warn!("Dropping page-view event for {}: {e}", event.page);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::PgPool;
    use std::time::Duration;

    #[sqlx::test]
    #[test_log::test]
    async fn test_pg_sink_persists_events(pool: PgPool) {
        let sink = PgAnalyticsSink::new(pool.clone());
        sink.emit(PageView {
            page: "/stories".to_string(),
            user_id: None,
            session_id: "visitor-1".to_string(),
        });

        // The insert happens on a spawned task; poll briefly for it
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = AnalyticsEvents::new(&mut conn);
        for _ in 0..50 {
            if repo.count_for_page("/stories").await.unwrap() == 1 {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("page view was never persisted");
    }
}
