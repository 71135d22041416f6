//! Database repository for administrator accounts.

use crate::types::{AdminId, abbrev_uuid};
use crate::db::{
    errors::{DbError, Result},
    handlers::repository::Repository,
    models::admins::{AdminCreateDBRequest, AdminDBResponse, AdminUpdateDBRequest},
};
use sqlx::PgConnection;
use tracing::instrument;
use uuid::Uuid;

/// Filter for listing admins
#[derive(Debug, Clone)]
pub struct AdminFilter {
    pub skip: i64,
    pub limit: i64,
}

pub struct Admins<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Admins<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Case-sensitive email lookup, same contract as the user repository.
    #[instrument(skip(self, email), err)]
    pub async fn get_by_email(&mut self, email: &str) -> Result<Option<AdminDBResponse>> {
        let admin = sqlx::query_as::<_, AdminDBResponse>("SELECT * FROM admins WHERE email = $1")
            .bind(email)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(admin)
    }
}

#[async_trait::async_trait]
impl<'c> Repository for Admins<'c> {
    type CreateRequest = AdminCreateDBRequest;
    type UpdateRequest = AdminUpdateDBRequest;
    type Response = AdminDBResponse;
    type Id = AdminId;
    type Filter = AdminFilter;

    #[instrument(skip(self, request), fields(email = %request.email), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let admin_id = Uuid::new_v4();

        let admin = sqlx::query_as::<_, AdminDBResponse>(
            r#"
            INSERT INTO admins (id, name, email, password_hash)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(admin_id)
        .bind(&request.name)
        .bind(&request.email)
        .bind(&request.password_hash)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(admin)
    }

    #[instrument(skip(self), fields(admin_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let admin = sqlx::query_as::<_, AdminDBResponse>("SELECT * FROM admins WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(admin)
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let admins = sqlx::query_as::<_, AdminDBResponse>("SELECT * FROM admins ORDER BY created_at DESC LIMIT $1 OFFSET $2")
            .bind(filter.limit)
            .bind(filter.skip)
            .fetch_all(&mut *self.db)
            .await?;

        Ok(admins)
    }

    #[instrument(skip(self), fields(admin_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM admins WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(admin_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let admin = sqlx::query_as::<_, AdminDBResponse>(
            r#"
            UPDATE admins SET
                name = COALESCE($2, name),
                password_hash = COALESCE($3, password_hash)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&request.name)
        .bind(&request.password_hash)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(admin)
    }
}
