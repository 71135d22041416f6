//! Request and response bodies for the authentication endpoints, plus the
//! session cookie builders.

use axum::{
    Json,
    http::{StatusCode, header::SET_COOKIE},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;

use crate::{
    api::models::{admins::AdminResponse, users::UserResponse},
    config::{PasswordConfig, SessionConfig},
    errors::Error,
};

/// Sign-up payload. Languages default server-side when omitted.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spoken_language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub learning_language: Option<String>,
}

impl SignupRequest {
    /// Field-level validation mirroring the sign-up form contract: name at
    /// least 2 characters, email shaped like an address, password within
    /// the configured bounds.
    pub fn validate(&self, password_config: &PasswordConfig) -> Result<(), Error> {
        let mut details = BTreeMap::new();

        if self.name.trim().chars().count() < 2 {
            details.insert("name".to_string(), "Name must be at least 2 characters".to_string());
        }

        if !looks_like_email(&self.email) {
            details.insert("email".to_string(), "Invalid email address".to_string());
        }

        if self.password.chars().count() < password_config.min_length {
            details.insert(
                "password".to_string(),
                format!("Password must be at least {} characters", password_config.min_length),
            );
        } else if self.password.chars().count() > password_config.max_length {
            details.insert(
                "password".to_string(),
                format!("Password must be no more than {} characters", password_config.max_length),
            );
        }

        if details.is_empty() { Ok(()) } else { Err(Error::Validation { details }) }
    }
}

/// Cheap shape check, not RFC 5322: one '@', something on both sides, and
/// a dot somewhere in the domain.
fn looks_like_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty() && !domain.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.') && !email.contains(' ')
}

/// Sign-in payload, shared by the user and admin endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SigninRequest {
    pub email: String,
    pub password: String,
}

/// Successful user authentication body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AuthResponse {
    pub success: bool,
    pub user: UserResponse,
}

/// Successful admin authentication body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AdminAuthResponse {
    pub success: bool,
    pub admin: AdminResponse,
}

/// Body for GET /me.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MeResponse {
    pub user: UserResponse,
}

/// Body for GET /admin/me.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AdminMeResponse {
    pub admin: AdminResponse,
}

/// Body for endpoints that only report an outcome (sign-out).
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AuthSuccessResponse {
    pub success: bool,
    pub message: String,
}

/// A JSON body paired with a Set-Cookie header and status code.
#[derive(Debug)]
pub struct SessionResponse<T> {
    pub status: StatusCode,
    pub body: T,
    pub cookie: String,
}

impl<T: Serialize> IntoResponse for SessionResponse<T> {
    fn into_response(self) -> Response {
        (self.status, [(SET_COOKIE, self.cookie)], Json(self.body)).into_response()
    }
}

/// Build the Set-Cookie value for a fresh session.
pub fn session_cookie(token: &str, session: &SessionConfig) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite={}; Max-Age={}",
        session.cookie_name,
        token,
        session.cookie_same_site,
        session.timeout.as_secs()
    );
    if session.cookie_secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Build the Set-Cookie value that clears a session cookie.
pub fn clear_session_cookie(session: &SessionConfig) -> String {
    let mut cookie = format!(
        "{}=; Path=/; HttpOnly; SameSite={}; Max-Age=0",
        session.cookie_name, session.cookie_same_site
    );
    if session.cookie_secure {
        cookie.push_str("; Secure");
    }
    cookie
}
