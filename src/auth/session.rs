//! Session lifecycle: creation, validation, destruction, sign-in/sign-up.
//!
//! User sessions are stateless: the signed token is the whole session, and
//! sign-out is nothing more than clearing the cookie. Admin sessions are
//! stateful: issuing one also persists an `admin_sessions` row, validation
//! requires that row to still exist and be unexpired, and destroying the
//! session deletes it. Admin sign-out is therefore a real revocation.

use chrono::Utc;
use sqlx::PgConnection;
use tracing::instrument;
use uuid::Uuid;

use crate::{
    api::models::auth::SignupRequest,
    auth::{
        password,
        token::{self, SessionKind},
    },
    config::Config,
    db::{
        handlers::{Admins, AdminSessions, Repository, Users},
        models::{
            sessions::AdminSessionCreateDBRequest,
            users::{UserCreateDBRequest, UserDBResponse},
        },
    },
    errors::{Error, Result},
    types::{AdminId, UserId},
};

use crate::db::models::admins::AdminDBResponse;

/// The principal behind a validated session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    pub principal_id: Uuid,
    pub email: String,
    pub kind: SessionKind,
}

fn invalid_credentials() -> Error {
    Error::Unauthenticated {
        message: Some("Invalid email or password".to_string()),
    }
}

/// Verify a password against a stored hash on a blocking thread, so Argon2
/// work never stalls the async runtime.
async fn verify_on_blocking_thread(password: String, hash: String) -> Result<bool> {
    tokio::task::spawn_blocking(move || password::verify_password(&password, &hash))
        .await
        .map_err(|e| Error::Internal {
            operation: format!("spawn password verification task: {e}"),
        })?
}

/// Create a stateless session for an existing user.
///
/// The user row must still exist at issuance time; a deleted account
/// cannot mint fresh sessions.
#[instrument(skip(conn, config), err)]
pub async fn create_user_session(conn: &mut PgConnection, user_id: UserId, config: &Config) -> Result<String> {
    let mut users = Users::new(conn);
    let user = users.get_by_id(user_id).await?.ok_or_else(|| Error::NotFound {
        resource: "User".to_string(),
        id: user_id.to_string(),
    })?;

    token::issue_session_token(user.id, &user.email, SessionKind::User, config)
}

/// Create a stateful session for an existing admin: issue the token and
/// persist its server-side record with a matching expiry.
#[instrument(skip(conn, config), err)]
pub async fn create_admin_session(conn: &mut PgConnection, admin_id: AdminId, config: &Config) -> Result<String> {
    let admin = {
        let mut admins = Admins::new(conn);
        admins.get_by_id(admin_id).await?.ok_or_else(|| Error::NotFound {
            resource: "Admin".to_string(),
            id: admin_id.to_string(),
        })?
    };

    let session_token = token::issue_session_token(admin.id, &admin.email, SessionKind::Admin, config)?;

    let mut sessions = AdminSessions::new(conn);
    sessions
        .create(&AdminSessionCreateDBRequest {
            admin_id: admin.id,
            token: session_token.clone(),
            expires_at: Utc::now() + SessionKind::Admin.ttl(config),
        })
        .await?;

    Ok(session_token)
}

/// Validate a user session token. Stateless: the token's own signature and
/// expiry are the whole story. Any verification failure reads as "no
/// session".
pub fn validate_user_session(session_token: &str, config: &Config) -> Option<SessionInfo> {
    let claims = token::verify_session_token(session_token, SessionKind::User, config).ok()?;
    Some(SessionInfo {
        principal_id: claims.sub,
        email: claims.email,
        kind: SessionKind::User,
    })
}

/// Validate an admin session token. The token must verify AND a live
/// server-side record must exist. An expired record found here is deleted
/// on the spot; losing that delete race to a concurrent request is fine.
#[instrument(skip_all, err)]
pub async fn validate_admin_session(conn: &mut PgConnection, session_token: &str, config: &Config) -> Result<Option<SessionInfo>> {
    let claims = match token::verify_session_token(session_token, SessionKind::Admin, config) {
        Ok(claims) => claims,
        Err(Error::Unauthenticated { .. }) => return Ok(None),
        Err(e) => return Err(e),
    };

    let mut sessions = AdminSessions::new(conn);
    let record = match sessions.get_by_token(session_token).await? {
        Some(record) => record,
        None => return Ok(None), // revoked or never issued
    };

    if record.is_expired(Utc::now()) {
        sessions.delete_by_token(session_token).await?;
        return Ok(None);
    }

    Ok(Some(SessionInfo {
        principal_id: claims.sub,
        email: claims.email,
        kind: SessionKind::Admin,
    }))
}

/// Destroy an admin session. Idempotent.
#[instrument(skip_all, err)]
pub async fn destroy_admin_session(conn: &mut PgConnection, session_token: &str) -> Result<bool> {
    let mut sessions = AdminSessions::new(conn);
    Ok(sessions.delete_by_token(session_token).await?)
}

/// Sign a user in with email and password, returning the account and a
/// fresh session token.
///
/// Unknown email and wrong password produce byte-identical errors so the
/// endpoint cannot be used to enumerate accounts.
#[instrument(skip(conn, password, config), err)]
pub async fn sign_in_user(conn: &mut PgConnection, email: &str, password: &str, config: &Config) -> Result<(UserDBResponse, String)> {
    let user = {
        let mut users = Users::new(conn);
        users.get_by_email(email).await?.ok_or_else(invalid_credentials)?
    };

    let is_valid = verify_on_blocking_thread(password.to_string(), user.password_hash.clone()).await?;
    if !is_valid {
        return Err(invalid_credentials());
    }

    let session_token = token::issue_session_token(user.id, &user.email, SessionKind::User, config)?;
    Ok((user, session_token))
}

/// Sign an admin in with email and password, creating a stateful session.
#[instrument(skip(conn, password, config), err)]
pub async fn sign_in_admin(conn: &mut PgConnection, email: &str, password: &str, config: &Config) -> Result<(AdminDBResponse, String)> {
    let admin = {
        let mut admins = Admins::new(conn);
        admins.get_by_email(email).await?.ok_or_else(invalid_credentials)?
    };

    let is_valid = verify_on_blocking_thread(password.to_string(), admin.password_hash.clone()).await?;
    if !is_valid {
        return Err(invalid_credentials());
    }

    let session_token = create_admin_session(conn, admin.id, config).await?;
    Ok((admin, session_token))
}

/// Register a new user account and hand back their first session.
///
/// Races past the duplicate pre-check land on the unique index, which
/// surfaces as the same 400.
#[instrument(skip_all, fields(email = %request.email), err)]
pub async fn sign_up_user(conn: &mut PgConnection, request: &SignupRequest, config: &Config) -> Result<(UserDBResponse, String)> {
    if !config.auth.allow_registration {
        return Err(Error::BadRequest {
            message: "User registration is disabled".to_string(),
        });
    }

    request.validate(&config.auth.password)?;

    {
        let mut users = Users::new(&mut *conn);
        if users.get_by_email(&request.email).await?.is_some() {
            return Err(Error::BadRequest {
                message: "An account with this email address already exists".to_string(),
            });
        }
    }

    // Hash the password on a blocking thread to avoid blocking the async runtime
    let params = password::Argon2Params::from(&config.auth.password);
    let plaintext = request.password.clone();
    let password_hash = tokio::task::spawn_blocking(move || password::hash_password_with_params(&plaintext, Some(params)))
        .await
        .map_err(|e| Error::Internal {
            operation: format!("spawn password hashing task: {e}"),
        })??;

    let user = {
        let mut users = Users::new(&mut *conn);
        users
            .create(&UserCreateDBRequest {
                name: request.name.clone(),
                email: request.email.clone(),
                password_hash,
                spoken_language: request.spoken_language.clone().unwrap_or_else(|| "en".to_string()),
                learning_language: request.learning_language.clone().unwrap_or_else(|| "fr".to_string()),
            })
            .await?
    };

    let session_token = token::issue_session_token(user.id, &user.email, SessionKind::User, config)?;
    Ok((user, session_token))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::admins::AdminCreateDBRequest;
    use crate::test_utils::create_test_config;
    use sqlx::PgPool;

    fn signup_request(email: &str) -> SignupRequest {
        SignupRequest {
            name: "Test Learner".to_string(),
            email: email.to_string(),
            password: "password123".to_string(),
            spoken_language: None,
            learning_language: None,
        }
    }

    async fn seed_admin(conn: &mut PgConnection, email: &str, password: &str) -> AdminId {
        let password_hash = password::hash_password(password).unwrap();
        let mut admins = Admins::new(conn);
        admins
            .create(&AdminCreateDBRequest {
                name: "Site Admin".to_string(),
                email: email.to_string(),
                password_hash,
            })
            .await
            .unwrap()
            .id
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_sign_up_then_sign_in(pool: PgPool) {
        let config = create_test_config();
        let mut conn = pool.acquire().await.unwrap();

        let (user, signup_token) = sign_up_user(&mut conn, &signup_request("learner@example.com"), &config).await.unwrap();
        assert_eq!(user.email, "learner@example.com");
        assert_eq!(user.spoken_language, "en");
        assert_eq!(user.learning_language, "fr");

        // The sign-up token is a valid user session
        let info = validate_user_session(&signup_token, &config).unwrap();
        assert_eq!(info.principal_id, user.id);

        let (signed_in, _) = sign_in_user(&mut conn, "learner@example.com", "password123", &config).await.unwrap();
        assert_eq!(signed_in.id, user.id);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_sign_in_errors_are_indistinguishable(pool: PgPool) {
        let config = create_test_config();
        let mut conn = pool.acquire().await.unwrap();

        sign_up_user(&mut conn, &signup_request("learner@example.com"), &config).await.unwrap();

        let unknown = sign_in_user(&mut conn, "nobody@example.com", "password123", &config)
            .await
            .unwrap_err();
        let wrong_pw = sign_in_user(&mut conn, "learner@example.com", "wrong-password", &config)
            .await
            .unwrap_err();

        assert_eq!(unknown.user_message(), wrong_pw.user_message());
        assert_eq!(unknown.status_code(), wrong_pw.status_code());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_duplicate_sign_up_rejected(pool: PgPool) {
        let config = create_test_config();
        let mut conn = pool.acquire().await.unwrap();

        sign_up_user(&mut conn, &signup_request("dup@example.com"), &config).await.unwrap();
        let err = sign_up_user(&mut conn, &signup_request("dup@example.com"), &config).await.unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::BAD_REQUEST);

        // Exactly one row exists
        let mut users = Users::new(&mut conn);
        assert!(users.get_by_email("dup@example.com").await.unwrap().is_some());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_registration_disabled(pool: PgPool) {
        let mut config = create_test_config();
        config.auth.allow_registration = false;
        let mut conn = pool.acquire().await.unwrap();

        let err = sign_up_user(&mut conn, &signup_request("learner@example.com"), &config).await.unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::BAD_REQUEST);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_admin_session_is_stateful(pool: PgPool) {
        let config = create_test_config();
        let mut conn = pool.acquire().await.unwrap();
        seed_admin(&mut conn, "admin@example.com", "admin-password").await;

        let (admin, session_token) = sign_in_admin(&mut conn, "admin@example.com", "admin-password", &config).await.unwrap();

        let info = validate_admin_session(&mut conn, &session_token, &config).await.unwrap().unwrap();
        assert_eq!(info.principal_id, admin.id);
        assert_eq!(info.kind, SessionKind::Admin);

        // Destroying the session revokes the token even though it would
        // still verify cryptographically
        assert!(destroy_admin_session(&mut conn, &session_token).await.unwrap());
        let after = validate_admin_session(&mut conn, &session_token, &config).await.unwrap();
        assert!(after.is_none());

        // Destroy again: idempotent
        assert!(!destroy_admin_session(&mut conn, &session_token).await.unwrap());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_expired_admin_record_is_lazily_deleted(pool: PgPool) {
        let config = create_test_config();
        let mut conn = pool.acquire().await.unwrap();
        let admin_id = seed_admin(&mut conn, "admin@example.com", "admin-password").await;

        // Token verifies fine, but its server-side record has expired
        let session_token = token::issue_session_token(admin_id, "admin@example.com", SessionKind::Admin, &config).unwrap();
        {
            let mut sessions = AdminSessions::new(&mut conn);
            sessions
                .create(&AdminSessionCreateDBRequest {
                    admin_id,
                    token: session_token.clone(),
                    expires_at: Utc::now() - chrono::Duration::hours(1),
                })
                .await
                .unwrap();
        }

        let result = validate_admin_session(&mut conn, &session_token, &config).await.unwrap();
        assert!(result.is_none());

        // The stale row was cleaned up during validation
        let mut sessions = AdminSessions::new(&mut conn);
        assert!(sessions.get_by_token(&session_token).await.unwrap().is_none());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_user_token_rejected_at_admin_boundary(pool: PgPool) {
        let config = create_test_config();
        let mut conn = pool.acquire().await.unwrap();

        let (user, session_token) = sign_up_user(&mut conn, &signup_request("learner@example.com"), &config).await.unwrap();
        assert_eq!(validate_user_session(&session_token, &config).unwrap().principal_id, user.id);

        let as_admin = validate_admin_session(&mut conn, &session_token, &config).await.unwrap();
        assert!(as_admin.is_none());
    }

    #[test]
    fn test_validate_user_session_garbage_token() {
        let config = create_test_config();
        assert!(validate_user_session("garbage", &config).is_none());
        assert!(validate_user_session("", &config).is_none());
    }
}
