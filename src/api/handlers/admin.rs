//! Handlers for the admin authentication endpoints.
//!
//! Admin sessions are stateful, so sign-out here actually revokes the
//! session server-side rather than just clearing the cookie.

use axum::{Json, extract::State, http::HeaderMap, http::StatusCode};

use crate::{
    AppState,
    api::models::auth::{
        AdminAuthResponse, AdminMeResponse, AuthSuccessResponse, SessionResponse, SigninRequest, clear_session_cookie, session_cookie,
    },
    auth::{extract::CurrentAdmin, middleware::cookie_value, session},
    errors::Error,
};

/// Sign in as an administrator
#[utoipa::path(
    post,
    path = "/admin/signin",
    request_body = SigninRequest,
    tag = "admin",
    responses(
        (status = 200, description = "Signed in", body = AdminAuthResponse),
        (status = 401, description = "Invalid credentials"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn admin_signin(
    State(state): State<AppState>,
    Json(request): Json<SigninRequest>,
) -> Result<SessionResponse<AdminAuthResponse>, Error> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

    let (admin, token) = session::sign_in_admin(&mut conn, &request.email, &request.password, &state.config).await?;
    let cookie = session_cookie(&token, &state.config.auth.admin_session);

    Ok(SessionResponse {
        status: StatusCode::OK,
        body: AdminAuthResponse {
            success: true,
            admin: admin.into(),
        },
        cookie,
    })
}

/// Get the signed-in administrator
#[utoipa::path(
    get,
    path = "/admin/me",
    tag = "admin",
    responses(
        (status = 200, description = "Current administrator", body = AdminMeResponse),
        (status = 401, description = "Not signed in"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn admin_me(current_admin: CurrentAdmin) -> Json<AdminMeResponse> {
    Json(AdminMeResponse {
        admin: crate::api::models::admins::AdminResponse {
            id: current_admin.id,
            name: current_admin.name,
            email: current_admin.email,
            created_at: current_admin.created_at,
        },
    })
}

/// Sign out as an administrator, revoking the session server-side
///
/// Succeeds whether or not a session was present; revoking an already
/// revoked session is a no-op.
#[utoipa::path(
    post,
    path = "/admin/signout",
    tag = "admin",
    responses(
        (status = 200, description = "Signed out", body = AuthSuccessResponse),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn admin_signout(State(state): State<AppState>, headers: HeaderMap) -> Result<SessionResponse<AuthSuccessResponse>, Error> {
    if let Some(token) = cookie_value(&headers, &state.config.auth.admin_session.cookie_name) {
        let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
        session::destroy_admin_session(&mut conn, &token).await?;
    }

    Ok(SessionResponse {
        status: StatusCode::OK,
        body: AuthSuccessResponse {
            success: true,
            message: "Signed out successfully".to_string(),
        },
        cookie: clear_session_cookie(&state.config.auth.admin_session),
    })
}
