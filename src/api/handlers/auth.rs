//! Handlers for the learner-facing authentication endpoints.

use axum::{Json, extract::State, http::StatusCode};

use crate::{
    AppState,
    api::models::auth::{
        AuthResponse, AuthSuccessResponse, MeResponse, SessionResponse, SigninRequest, SignupRequest, clear_session_cookie, session_cookie,
    },
    auth::{extract::CurrentUser, session},
    errors::Error,
};

/// Register a new account
#[utoipa::path(
    post,
    path = "/signup",
    request_body = SignupRequest,
    tag = "auth",
    responses(
        (status = 201, description = "Account created", body = AuthResponse),
        (status = 400, description = "Validation failure or duplicate email"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn signup(State(state): State<AppState>, Json(request): Json<SignupRequest>) -> Result<SessionResponse<AuthResponse>, Error> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

    let (user, token) = session::sign_up_user(&mut conn, &request, &state.config).await?;
    let cookie = session_cookie(&token, &state.config.auth.user_session);

    Ok(SessionResponse {
        status: StatusCode::CREATED,
        body: AuthResponse {
            success: true,
            user: user.into(),
        },
        cookie,
    })
}

/// Sign in with email and password
#[utoipa::path(
    post,
    path = "/signin",
    request_body = SigninRequest,
    tag = "auth",
    responses(
        (status = 200, description = "Signed in", body = AuthResponse),
        (status = 401, description = "Invalid credentials"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn signin(State(state): State<AppState>, Json(request): Json<SigninRequest>) -> Result<SessionResponse<AuthResponse>, Error> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

    let (user, token) = session::sign_in_user(&mut conn, &request.email, &request.password, &state.config).await?;
    let cookie = session_cookie(&token, &state.config.auth.user_session);

    Ok(SessionResponse {
        status: StatusCode::OK,
        body: AuthResponse {
            success: true,
            user: user.into(),
        },
        cookie,
    })
}

/// Sign out (clear the session cookie)
///
/// User sessions are stateless, so there is nothing to revoke server-side;
/// the endpoint succeeds whether or not a session was present.
#[utoipa::path(
    post,
    path = "/signout",
    tag = "auth",
    responses(
        (status = 200, description = "Signed out", body = AuthSuccessResponse),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn signout(State(state): State<AppState>) -> SessionResponse<AuthSuccessResponse> {
    SessionResponse {
        status: StatusCode::OK,
        body: AuthSuccessResponse {
            success: true,
            message: "Signed out successfully".to_string(),
        },
        cookie: clear_session_cookie(&state.config.auth.user_session),
    }
}

/// Get the signed-in account
#[utoipa::path(
    get,
    path = "/me",
    tag = "auth",
    responses(
        (status = 200, description = "Current account", body = MeResponse),
        (status = 401, description = "Not signed in"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn me(current_user: CurrentUser) -> Json<MeResponse> {
    Json(MeResponse {
        user: crate::api::models::users::UserResponse {
            id: current_user.id,
            name: current_user.name,
            email: current_user.email,
            spoken_language: current_user.spoken_language,
            learning_language: current_user.learning_language,
            created_at: current_user.created_at,
        },
    })
}
