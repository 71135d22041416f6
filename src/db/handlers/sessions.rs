//! Database repository for server-side admin session records.
//!
//! Admin sessions are stateful: a token is only accepted while its row is
//! present and unexpired. This table is append/lookup/delete only, so it
//! carries inherent methods instead of the generic [`Repository`] trait.
//!
//! [`Repository`]: crate::db::handlers::repository::Repository

use crate::db::{
    errors::Result,
    models::sessions::{AdminSessionCreateDBRequest, AdminSessionDBResponse},
};
use crate::types::abbrev_uuid;
use sqlx::PgConnection;
use tracing::instrument;
use uuid::Uuid;

pub struct AdminSessions<'c> {
    db: &'c mut PgConnection,
}

impl<'c> AdminSessions<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self, request), fields(admin_id = %abbrev_uuid(&request.admin_id)), err)]
    pub async fn create(&mut self, request: &AdminSessionCreateDBRequest) -> Result<AdminSessionDBResponse> {
        let session_id = Uuid::new_v4();

        let session = sqlx::query_as::<_, AdminSessionDBResponse>(
            r#"
            INSERT INTO admin_sessions (id, admin_id, token, expires_at)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(session_id)
        .bind(request.admin_id)
        .bind(&request.token)
        .bind(request.expires_at)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(session)
    }

    #[instrument(skip(self, token), err)]
    pub async fn get_by_token(&mut self, token: &str) -> Result<Option<AdminSessionDBResponse>> {
        let session = sqlx::query_as::<_, AdminSessionDBResponse>("SELECT * FROM admin_sessions WHERE token = $1")
            .bind(token)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(session)
    }

    /// Delete a session record by token. Idempotent: deleting a token that
    /// has no record (or was already deleted by a concurrent request)
    /// reports `false` rather than erroring.
    #[instrument(skip(self, token), err)]
    pub async fn delete_by_token(&mut self, token: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM admin_sessions WHERE token = $1")
            .bind(token)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Sweep expired session rows. Called lazily during validation; safe to
    /// run concurrently.
    #[instrument(skip(self), err)]
    pub async fn delete_expired(&mut self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM admin_sessions WHERE expires_at <= NOW()")
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{handlers::Repository, handlers::admins::Admins, models::admins::AdminCreateDBRequest};
    use crate::types::AdminId;
    use chrono::{Duration, Utc};
    use sqlx::PgPool;

    async fn seed_admin(conn: &mut PgConnection) -> AdminId {
        let mut repo = Admins::new(conn);
        repo.create(&AdminCreateDBRequest {
            name: "Site Admin".to_string(),
            email: "admin@example.com".to_string(),
            password_hash: "$argon2id$fake$hash".to_string(),
        })
        .await
        .unwrap()
        .id
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_and_get_session(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let admin_id = seed_admin(&mut conn).await;

        let mut repo = AdminSessions::new(&mut conn);
        let created = repo
            .create(&AdminSessionCreateDBRequest {
                admin_id,
                token: "token-abc".to_string(),
                expires_at: Utc::now() + Duration::days(1),
            })
            .await
            .unwrap();

        let fetched = repo.get_by_token("token-abc").await.unwrap().unwrap();
        assert_eq!(fetched.id, created.id);
        assert_eq!(fetched.admin_id, admin_id);
        assert!(!fetched.is_expired(Utc::now()));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_delete_by_token_is_idempotent(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let admin_id = seed_admin(&mut conn).await;

        let mut repo = AdminSessions::new(&mut conn);
        repo.create(&AdminSessionCreateDBRequest {
            admin_id,
            token: "token-abc".to_string(),
            expires_at: Utc::now() + Duration::days(1),
        })
        .await
        .unwrap();

        assert!(repo.delete_by_token("token-abc").await.unwrap());
        assert!(!repo.delete_by_token("token-abc").await.unwrap());
        assert!(repo.get_by_token("token-abc").await.unwrap().is_none());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_delete_expired_sweeps_only_stale_rows(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let admin_id = seed_admin(&mut conn).await;

        let mut repo = AdminSessions::new(&mut conn);
        repo.create(&AdminSessionCreateDBRequest {
            admin_id,
            token: "stale".to_string(),
            expires_at: Utc::now() - Duration::hours(1),
        })
        .await
        .unwrap();
        repo.create(&AdminSessionCreateDBRequest {
            admin_id,
            token: "live".to_string(),
            expires_at: Utc::now() + Duration::hours(1),
        })
        .await
        .unwrap();

        assert_eq!(repo.delete_expired().await.unwrap(), 1);
        assert!(repo.get_by_token("stale").await.unwrap().is_none());
        assert!(repo.get_by_token("live").await.unwrap().is_some());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_sessions_cascade_on_admin_delete(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let admin_id = seed_admin(&mut conn).await;

        {
            let mut repo = AdminSessions::new(&mut conn);
            repo.create(&AdminSessionCreateDBRequest {
                admin_id,
                token: "token-abc".to_string(),
                expires_at: Utc::now() + Duration::days(1),
            })
            .await
            .unwrap();
        }

        let mut admins = Admins::new(&mut conn);
        assert!(admins.delete(admin_id).await.unwrap());

        let mut repo = AdminSessions::new(&mut conn);
        assert!(repo.get_by_token("token-abc").await.unwrap().is_none());
    }
}
