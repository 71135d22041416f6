//! Shared helpers for the test suite: config, seeded accounts, and servers
//! with the access gate applied the same way production applies it.

use axum::ServiceExt;
use axum::middleware::from_fn_with_state;
use axum_test::TestServer;
use sqlx::PgPool;
use std::sync::{Arc, Mutex};
use tower::Layer as _;

use crate::{
    AppState,
    analytics::{AnalyticsSink, PageView},
    auth::{password, session},
    config::Config,
    db::{
        handlers::{Admins, Repository, Users},
        models::{
            admins::{AdminCreateDBRequest, AdminDBResponse},
            users::{UserCreateDBRequest, UserDBResponse},
        },
    },
};

pub fn create_test_config() -> Config {
    let mut config = Config {
        secret_key: Some("test-secret-key".to_string()),
        ..Default::default()
    };
    // Cheap hashing parameters so the suite stays fast
    config.auth.password.argon2_memory_kib = 1024;
    config.auth.password.argon2_iterations = 1;
    config
}

/// An [`AnalyticsSink`] that records events in memory for assertions.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<PageView>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<PageView> {
        self.events.lock().unwrap().clone()
    }
}

impl AnalyticsSink for RecordingSink {
    fn emit(&self, event: PageView) {
        self.events.lock().unwrap().push(event);
    }
}

pub fn test_state(pool: PgPool) -> AppState {
    AppState::builder()
        .db(pool)
        .config(create_test_config())
        .analytics(Arc::new(RecordingSink::default()))
        .build()
}

/// Insert a user with the given credentials, hashed for real so sign-in
/// works against it.
pub async fn seed_user(pool: &PgPool, email: &str, plaintext: &str) -> UserDBResponse {
    let password_hash = password::hash_password(plaintext).unwrap();
    let mut conn = pool.acquire().await.unwrap();
    let mut users = Users::new(&mut conn);
    users
        .create(&UserCreateDBRequest {
            name: "Test Learner".to_string(),
            email: email.to_string(),
            password_hash,
            spoken_language: "en".to_string(),
            learning_language: "fr".to_string(),
        })
        .await
        .unwrap()
}

/// Insert an admin and open a live session for them, returning the account
/// and its session token.
pub async fn seed_admin_with_session(pool: &PgPool, email: &str, plaintext: &str) -> (AdminDBResponse, String) {
    let config = create_test_config();
    let password_hash = password::hash_password(plaintext).unwrap();
    let mut conn = pool.acquire().await.unwrap();

    let admin = {
        let mut admins = Admins::new(&mut conn);
        admins
            .create(&AdminCreateDBRequest {
                name: "Site Admin".to_string(),
                email: email.to_string(),
                password_hash,
            })
            .await
            .unwrap()
    };

    let token = session::create_admin_session(&mut conn, admin.id, &config).await.unwrap();
    (admin, token)
}

pub fn test_server(pool: PgPool) -> TestServer {
    test_server_with_sink(pool).0
}

/// Build a test server over the full router, access gate included, and hand
/// back the recording sink for analytics assertions.
pub fn test_server_with_sink(pool: PgPool) -> (TestServer, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::default());
    let state = AppState::builder()
        .db(pool)
        .config(create_test_config())
        .analytics(sink.clone() as Arc<dyn AnalyticsSink>)
        .build();

    let router = crate::router(state.clone()).expect("failed to build router");
    // Same layering as Application::serve: the gate runs before path matching
    let gate = from_fn_with_state(state, crate::auth::middleware::access_gate);
    let service = gate.layer(router);

    let server = TestServer::new(service.into_make_service()).expect("failed to create test server");
    (server, sink)
}
