//! Database repository for append-only analytics events.

use crate::db::{errors::Result, models::analytics::AnalyticsEventCreateDBRequest};
use sqlx::PgConnection;
use tracing::instrument;
use uuid::Uuid;

pub struct AnalyticsEvents<'c> {
    db: &'c mut PgConnection,
}

impl<'c> AnalyticsEvents<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self, request), fields(page = %request.page), err)]
    pub async fn insert(&mut self, request: &AnalyticsEventCreateDBRequest) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO analytics_events (id, event_type, event_name, page, user_id, session_id, properties)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&request.event_type)
        .bind(&request.event_name)
        .bind(&request.page)
        .bind(request.user_id)
        .bind(&request.session_id)
        .bind(&request.properties)
        .execute(&mut *self.db)
        .await?;

        Ok(())
    }

    /// Count events recorded for a page. Test and debugging helper.
    #[instrument(skip(self), err)]
    pub async fn count_for_page(&mut self, page: &str) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM analytics_events WHERE page = $1")
            .bind(page)
            .fetch_one(&mut *self.db)
            .await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::PgPool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_insert_and_count(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = AnalyticsEvents::new(&mut conn);

        repo.insert(&AnalyticsEventCreateDBRequest {
            event_type: "page_view".to_string(),
            event_name: "page_view".to_string(),
            page: "/dashboard".to_string(),
            user_id: None,
            session_id: "visitor-1".to_string(),
            properties: serde_json::json!({}),
        })
        .await
        .unwrap();

        assert_eq!(repo.count_for_page("/dashboard").await.unwrap(), 1);
        assert_eq!(repo.count_for_page("/stories").await.unwrap(), 0);
    }
}
