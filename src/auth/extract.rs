//! Axum extractors for the authenticated principal behind a request.
//!
//! Both extractors read the session cookie, validate the session, and then
//! confirm the principal row still exists. A deleted account therefore
//! stops authenticating immediately, even while its token is still
//! cryptographically valid.

use axum::{extract::FromRequestParts, http::request::Parts};
use tracing::{instrument, trace};

use crate::{
    AppState,
    auth::session,
    config::Config,
    db::handlers::{Admins, Repository, Users},
    errors::{Error, Result},
    types::{AdminId, UserId},
};

/// The authenticated learner behind a request.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub spoken_language: String,
    pub learning_language: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// The authenticated administrator behind a request.
#[derive(Debug, Clone)]
pub struct CurrentAdmin {
    pub id: AdminId,
    pub name: String,
    pub email: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Pull a named cookie's value out of the Cookie header, if present.
pub fn session_cookie_value<'a>(parts: &'a Parts, cookie_name: &str) -> Option<&'a str> {
    let cookie_header = parts.headers.get(axum::http::header::COOKIE)?;
    let cookie_str = cookie_header.to_str().ok()?;

    for cookie in cookie_str.split(';') {
        let cookie = cookie.trim();
        if let Some((name, value)) = cookie.split_once('=')
            && name == cookie_name
        {
            return Some(value);
        }
    }
    None
}

/// Extract a user session from the request cookie if present and valid.
/// Returns:
/// - None: no session cookie present
/// - Some(info): cookie present and token verified
fn try_user_session(parts: &Parts, config: &Config) -> Option<session::SessionInfo> {
    let token = session_cookie_value(parts, &config.auth.user_session.cookie_name)?;
    session::validate_user_session(token, config)
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Error;

    #[instrument(skip(parts, state))]
    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let info = match try_user_session(parts, &state.config) {
            Some(info) => info,
            None => {
                trace!("No valid user session cookie on request");
                return Err(Error::Unauthenticated { message: None });
            }
        };

        let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
        let mut users = Users::new(&mut conn);
        let user = users
            .get_by_id(info.principal_id)
            .await?
            .ok_or(Error::Unauthenticated { message: None })?;

        Ok(CurrentUser {
            id: user.id,
            name: user.name,
            email: user.email,
            spoken_language: user.spoken_language,
            learning_language: user.learning_language,
            created_at: user.created_at,
        })
    }
}

impl FromRequestParts<AppState> for CurrentAdmin {
    type Rejection = Error;

    #[instrument(skip(parts, state))]
    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let token = session_cookie_value(parts, &state.config.auth.admin_session.cookie_name)
            .ok_or(Error::Unauthenticated { message: None })?
            .to_string();

        let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

        let info = session::validate_admin_session(&mut conn, &token, &state.config)
            .await?
            .ok_or(Error::Unauthenticated { message: None })?;

        let mut admins = Admins::new(&mut conn);
        let admin = admins
            .get_by_id(info.principal_id)
            .await?
            .ok_or(Error::Unauthenticated { message: None })?;

        Ok(CurrentAdmin {
            id: admin.id,
            name: admin.name,
            email: admin.email,
            created_at: admin.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::token::{SessionKind, issue_session_token};
    use crate::test_utils::{create_test_config, seed_user, test_state};
    use axum::extract::FromRequestParts as _;
    use sqlx::PgPool;

    fn parts_with_cookie(cookie: &str) -> Parts {
        let request = axum::http::Request::builder()
            .uri("http://localhost/test")
            .header(axum::http::header::COOKIE, cookie)
            .body(())
            .unwrap();
        request.into_parts().0
    }

    #[test]
    fn test_cookie_parsing() {
        let parts = parts_with_cookie("session-id=abc; auth-token=tok123; other=x");
        assert_eq!(session_cookie_value(&parts, "auth-token"), Some("tok123"));
        assert_eq!(session_cookie_value(&parts, "session-id"), Some("abc"));
        assert_eq!(session_cookie_value(&parts, "admin-auth-token"), None);
    }

    #[test]
    fn test_cookie_parsing_no_header() {
        let request = axum::http::Request::builder().uri("http://localhost/test").body(()).unwrap();
        let (parts, _) = request.into_parts();
        assert_eq!(session_cookie_value(&parts, "auth-token"), None);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_current_user_extraction(pool: PgPool) {
        let state = test_state(pool.clone());
        let user = seed_user(&pool, "learner@example.com", "password123").await;

        let token = issue_session_token(user.id, &user.email, SessionKind::User, &state.config).unwrap();
        let mut parts = parts_with_cookie(&format!("auth-token={token}"));

        let current = CurrentUser::from_request_parts(&mut parts, &state).await.unwrap();
        assert_eq!(current.id, user.id);
        assert_eq!(current.email, "learner@example.com");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_deleted_user_is_unauthenticated(pool: PgPool) {
        let state = test_state(pool.clone());
        let user = seed_user(&pool, "learner@example.com", "password123").await;
        let token = issue_session_token(user.id, &user.email, SessionKind::User, &state.config).unwrap();

        {
            let mut conn = pool.acquire().await.unwrap();
            let mut users = Users::new(&mut conn);
            users.delete(user.id).await.unwrap();
        }

        let mut parts = parts_with_cookie(&format!("auth-token={token}"));
        let result = CurrentUser::from_request_parts(&mut parts, &state).await;
        assert_eq!(result.unwrap_err().status_code(), axum::http::StatusCode::UNAUTHORIZED);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_missing_cookie_is_unauthenticated(pool: PgPool) {
        let state = test_state(pool.clone());
        let request = axum::http::Request::builder().uri("http://localhost/test").body(()).unwrap();
        let (mut parts, _) = request.into_parts();

        let result = CurrentUser::from_request_parts(&mut parts, &state).await;
        assert_eq!(result.unwrap_err().status_code(), axum::http::StatusCode::UNAUTHORIZED);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_user_token_not_accepted_as_admin(pool: PgPool) {
        let state = test_state(pool.clone());
        let user = seed_user(&pool, "learner@example.com", "password123").await;
        let token = issue_session_token(user.id, &user.email, SessionKind::User, &state.config).unwrap();

        // Even presented under the admin cookie name, a user token is rejected
        let mut parts = parts_with_cookie(&format!("admin-auth-token={token}"));
        let result = CurrentAdmin::from_request_parts(&mut parts, &state).await;
        assert_eq!(result.unwrap_err().status_code(), axum::http::StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_garbage_token_yields_none() {
        let config = create_test_config();
        let parts = parts_with_cookie("auth-token=garbage.token.value");
        assert!(try_user_session(&parts, &config).is_none());
    }
}
