//! The access gate: route classification, redirect enforcement, and
//! page-view analytics.
//!
//! The gate runs ahead of the router for every request, but only applies
//! page semantics to GET requests, so the JSON API endpoints that share
//! paths with auth pages (POST /signin, POST /signup, POST /admin/signin)
//! are never redirected. Session validation failures of any kind read as
//! "not signed in"; the gate never turns one into a 500.

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Method, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{instrument, warn};
use uuid::Uuid;

use crate::{
    AppState,
    analytics::PageView,
    auth::session,
    config::AnalyticsConfig,
};

/// What the gate should do with a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    /// Admin pages: require a live admin session or bounce to /admin/signin
    AdminProtected,
    /// The admin sign-in page: bounce signed-in admins to /admin
    AdminAuthPage,
    /// Learner pages: require a user session or bounce to /signin
    UserProtected,
    /// The sign-in/sign-up pages: bounce signed-in users to /dashboard
    UserAuthPage,
    /// Everything else, including the API endpoints that enforce their own 401s
    Public,
}

const USER_PROTECTED_PREFIXES: &[&str] = &["/dashboard", "/stories", "/flashcards", "/chat"];

fn matches_prefix(path: &str, prefix: &str) -> bool {
    path == prefix || path.starts_with(&format!("{prefix}/"))
}

/// Classify a request path. Pure, so the redirect rules are testable
/// without a server.
pub fn classify_route(path: &str) -> RouteClass {
    if path == "/admin/signin" {
        return RouteClass::AdminAuthPage;
    }
    // Admin API endpoints answer with their own 401s rather than redirects
    if path == "/admin/me" || path == "/admin/signout" {
        return RouteClass::Public;
    }
    if matches_prefix(path, "/admin") {
        return RouteClass::AdminProtected;
    }
    if path == "/signin" || path == "/signup" {
        return RouteClass::UserAuthPage;
    }
    if USER_PROTECTED_PREFIXES.iter().any(|prefix| matches_prefix(path, prefix)) {
        return RouteClass::UserProtected;
    }
    RouteClass::Public
}

pub(crate) fn cookie_value(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    let cookie_str = headers.get(header::COOKIE)?.to_str().ok()?;
    for cookie in cookie_str.split(';') {
        let cookie = cookie.trim();
        if let Some((name, value)) = cookie.split_once('=')
            && name == cookie_name
        {
            return Some(value.to_string());
        }
    }
    None
}

fn redirect(to: String) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, to)], ()).into_response()
}

/// Encode a path for use as a query-string value. Reserved characters in
/// the path must not corrupt the query it is embedded in.
fn query_encode(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

/// Build the Set-Cookie value for a freshly minted anonymous visitor id.
fn visitor_cookie(visitor_id: &str, config: &AnalyticsConfig) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        config.visitor_cookie_name,
        visitor_id,
        config.visitor_cookie_max_age.as_secs()
    );
    if config.visitor_cookie_secure {
        cookie.push_str("; Secure");
    }
    cookie
}

fn is_trackable(path: &str, config: &AnalyticsConfig) -> bool {
    config.trackable_pages.iter().any(|page| {
        if page == "/" {
            path == "/"
        } else {
            matches_prefix(path, page)
        }
    })
}

/// Whether an admin session cookie on this request validates. Errors are
/// logged and read as "not signed in".
async fn has_admin_session(state: &AppState, headers: &HeaderMap) -> bool {
    let Some(token) = cookie_value(headers, &state.config.auth.admin_session.cookie_name) else {
        return false;
    };

    let mut conn = match state.db.acquire().await {
        Ok(conn) => conn,
        Err(e) => {
            warn!("Access gate could not acquire a database connection: {e}");
            return false;
        }
    };

    match session::validate_admin_session(&mut conn, &token, &state.config).await {
        Ok(Some(_)) => true,
        Ok(None) => false,
        Err(e) => {
            warn!("Admin session validation failed in access gate: {e}");
            false
        }
    }
}

fn user_session(state: &AppState, headers: &HeaderMap) -> Option<session::SessionInfo> {
    let token = cookie_value(headers, &state.config.auth.user_session.cookie_name)?;
    session::validate_user_session(&token, &state.config)
}

#[instrument(skip_all, fields(path = %request.uri().path(), method = %request.method()))]
pub async fn access_gate(State(state): State<AppState>, request: axum::http::Request<Body>, next: Next) -> Response {
    // Page semantics only apply to GETs; API posts pass straight through.
    if request.method() != Method::GET {
        return next.run(request).await;
    }

    let path = request.uri().path().to_string();
    let headers = request.headers().clone();

    // Page-view analytics: fire-and-forget, before any redirect decision,
    // so bounced visits are counted too.
    let mut minted_visitor_cookie = None;
    if state.config.analytics.enabled && is_trackable(&path, &state.config.analytics) {
        let visitor_id = match cookie_value(&headers, &state.config.analytics.visitor_cookie_name) {
            Some(id) => id,
            None => {
                let id = Uuid::new_v4().to_string();
                minted_visitor_cookie = Some(id.clone());
                id
            }
        };
        let user_id = user_session(&state, &headers).map(|info| info.principal_id);
        state.analytics.emit(PageView {
            page: path.clone(),
            user_id,
            session_id: visitor_id,
        });
    }

    let mut response = match classify_route(&path) {
        RouteClass::AdminProtected => {
            if has_admin_session(&state, &headers).await {
                next.run(request).await
            } else {
                redirect("/admin/signin".to_string())
            }
        }
        RouteClass::AdminAuthPage => {
            if has_admin_session(&state, &headers).await {
                redirect("/admin".to_string())
            } else {
                next.run(request).await
            }
        }
        RouteClass::UserProtected => {
            if user_session(&state, &headers).is_some() {
                next.run(request).await
            } else {
                redirect(format!("/signin?callbackUrl={}", query_encode(&path)))
            }
        }
        RouteClass::UserAuthPage => {
            if user_session(&state, &headers).is_some() {
                redirect("/dashboard".to_string())
            } else {
                next.run(request).await
            }
        }
        RouteClass::Public => next.run(request).await,
    };

    if let Some(visitor_id) = minted_visitor_cookie {
        let cookie = visitor_cookie(&visitor_id, &state.config.analytics);
        if let Ok(value) = cookie.parse() {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
    }

    response
}
