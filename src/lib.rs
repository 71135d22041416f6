//! Session-based authentication service for the Lingua language-learning
//! platform.
//!
//! The service owns two separate authentication surfaces:
//!
//! - **Learners** get stateless sessions: a signed token in the
//!   `auth-token` cookie is the whole session, and sign-out just clears
//!   the cookie.
//! - **Admins** get stateful sessions: the signed token must also match a
//!   live `admin_sessions` row, so admin sign-out is a real server-side
//!   revocation.
//!
//! An access gate runs ahead of the router for every GET request, bouncing
//! unauthenticated visitors off protected pages, bouncing signed-in
//! visitors off the auth pages, and recording page-view analytics along
//! the way.

pub mod analytics;
pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod openapi;
pub mod telemetry;
pub mod types;

#[cfg(test)]
pub mod test_utils;

use std::sync::Arc;

use axum::{
    Router, ServiceExt,
    http::{self, HeaderValue},
    middleware::from_fn_with_state,
    routing::{get, post},
};
use bon::Builder;
use sqlx::PgPool;
use tokio::net::TcpListener;
use tower::Layer as _;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, info, instrument, warn};
use utoipa::OpenApi as _;
use utoipa_scalar::{Scalar, Servable};

use crate::{
    analytics::{AnalyticsSink, PgAnalyticsSink},
    db::handlers::{Admins, Repository},
    db::models::admins::{AdminCreateDBRequest, AdminUpdateDBRequest},
    openapi::ApiDoc,
    types::AdminId,
};

pub use crate::config::Config;

/// Shared application state, cloned into every handler.
#[derive(Clone, Builder)]
pub struct AppState {
    pub db: PgPool,
    pub config: Config,
    pub analytics: Arc<dyn AnalyticsSink>,
}

pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

/// Provision the initial admin account on startup.
///
/// Idempotent: an existing account keeps its id, with the password updated
/// when one is configured. When the account does not exist and no password
/// is configured, provisioning is skipped with a warning rather than
/// failing startup.
#[instrument(skip_all, fields(email = %email))]
pub async fn create_initial_admin(email: &str, password: Option<&str>, db: &PgPool) -> anyhow::Result<Option<AdminId>> {
    let password_hash = match password {
        Some(plaintext) => Some(auth::password::hash_password(plaintext)?),
        None => None,
    };

    let mut tx = db.begin().await?;
    let mut admins = Admins::new(&mut tx);

    if let Some(existing) = admins.get_by_email(email).await? {
        if let Some(password_hash) = password_hash {
            admins
                .update(
                    existing.id,
                    &AdminUpdateDBRequest {
                        password_hash: Some(password_hash),
                        ..Default::default()
                    },
                )
                .await?;
        }
        tx.commit().await?;
        return Ok(Some(existing.id));
    }

    let Some(password_hash) = password_hash else {
        warn!("Admin account does not exist and no admin_password is configured; skipping provisioning");
        return Ok(None);
    };

    let created = admins
        .create(&AdminCreateDBRequest {
            name: "Administrator".to_string(),
            email: email.to_string(),
            password_hash,
        })
        .await?;

    tx.commit().await?;
    Ok(Some(created.id))
}

fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let mut origins = Vec::new();
    for origin in &config.cors.allowed_origins {
        origins.push(origin.parse::<HeaderValue>()?);
    }

    Ok(CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(config.cors.allow_credentials)
        .allow_methods([http::Method::GET, http::Method::POST])
        .allow_headers([http::header::CONTENT_TYPE])
        .expose_headers(vec![http::header::LOCATION]))
}

async fn healthz() -> &'static str {
    "ok"
}

/// Build the application router.
///
/// The access gate is not part of this router; it is layered outside it
/// (see [`Application::serve`]) so that page paths with no handler behind
/// them are still gated.
pub fn router(state: AppState) -> anyhow::Result<Router> {
    let cors = create_cors_layer(&state.config)?;

    let router = Router::new()
        .route("/signup", post(api::handlers::auth::signup))
        .route("/signin", post(api::handlers::auth::signin))
        .route("/signout", post(api::handlers::auth::signout))
        .route("/me", get(api::handlers::auth::me))
        .route("/admin/signin", post(api::handlers::admin::admin_signin))
        .route("/admin/signout", post(api::handlers::admin::admin_signout))
        .route("/admin/me", get(api::handlers::admin::admin_me))
        .route("/healthz", get(healthz))
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::DEBUG))
                .on_response(DefaultOnResponse::new().level(Level::DEBUG)),
        )
        .layer(cors)
        .with_state(state);

    Ok(router)
}

/// The assembled application.
///
/// 1. [`Application::new`] connects to Postgres, runs migrations, and
///    provisions the initial admin account
/// 2. [`Application::serve`] binds the listener and handles requests until
///    the shutdown future resolves
pub struct Application {
    router: Router,
    state: AppState,
    config: Config,
    pool: PgPool,
}

impl Application {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(10)
            .connect(&config.database_url)
            .await?;

        migrator().run(&pool).await?;

        create_initial_admin(&config.admin_email, config.admin_password.as_deref(), &pool)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to provision initial admin account: {e}"))?;

        let state = AppState::builder()
            .db(pool.clone())
            .config(config.clone())
            .analytics(Arc::new(PgAnalyticsSink::new(pool.clone())) as Arc<dyn AnalyticsSink>)
            .build();

        let router = router(state.clone())?;

        Ok(Self {
            router,
            state,
            config,
            pool,
        })
    }

    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&bind_addr).await?;
        info!("lingua-auth listening on http://{bind_addr}");

        // Apply the access gate before path matching
        let gate = from_fn_with_state(self.state, auth::middleware::access_gate);
        let service = gate.layer(self.router);

        axum::serve(listener, service.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Closing database connections...");
        self.pool.close().await;

        info!("Shutting down telemetry...");
        telemetry::shutdown_telemetry();

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::verify_password;
    use sqlx::PgPool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_initial_admin_is_idempotent(pool: PgPool) {
        let first = create_initial_admin("admin@example.com", Some("first-password"), &pool)
            .await
            .unwrap()
            .unwrap();
        let second = create_initial_admin("admin@example.com", Some("second-password"), &pool)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first, second);

        // The second call rotated the password
        let mut conn = pool.acquire().await.unwrap();
        let mut admins = Admins::new(&mut conn);
        let admin = admins.get_by_email("admin@example.com").await.unwrap().unwrap();
        assert!(verify_password("second-password", &admin.password_hash).unwrap());
        assert!(!verify_password("first-password", &admin.password_hash).unwrap());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_initial_admin_without_password_skips(pool: PgPool) {
        let result = create_initial_admin("admin@example.com", None, &pool).await.unwrap();
        assert!(result.is_none());

        let mut conn = pool.acquire().await.unwrap();
        let mut admins = Admins::new(&mut conn);
        assert!(admins.get_by_email("admin@example.com").await.unwrap().is_none());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_existing_admin_kept_when_no_password_configured(pool: PgPool) {
        let id = create_initial_admin("admin@example.com", Some("keep-me"), &pool)
            .await
            .unwrap()
            .unwrap();

        let again = create_initial_admin("admin@example.com", None, &pool).await.unwrap().unwrap();
        assert_eq!(id, again);

        let mut conn = pool.acquire().await.unwrap();
        let mut admins = Admins::new(&mut conn);
        let admin = admins.get_by_email("admin@example.com").await.unwrap().unwrap();
        assert!(verify_password("keep-me", &admin.password_hash).unwrap());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_healthz(pool: PgPool) {
        let server = crate::test_utils::test_server(pool);
        let response = server.get("/healthz").await;
        response.assert_status_ok();
        assert_eq!(response.text(), "ok");
    }
}
