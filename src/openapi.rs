//! OpenAPI documentation for the authentication API, served at `/docs`.

use utoipa::OpenApi;

use crate::api::{handlers, models};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Lingua Auth API",
        description = "Session-based authentication for the Lingua platform: \
            learner sign-up/sign-in with stateless cookie sessions, and a \
            separate stateful admin session surface."
    ),
    paths(
        handlers::auth::signup,
        handlers::auth::signin,
        handlers::auth::signout,
        handlers::auth::me,
        handlers::admin::admin_signin,
        handlers::admin::admin_me,
        handlers::admin::admin_signout,
    ),
    components(schemas(
        models::auth::SignupRequest,
        models::auth::SigninRequest,
        models::auth::AuthResponse,
        models::auth::AdminAuthResponse,
        models::auth::MeResponse,
        models::auth::AdminMeResponse,
        models::auth::AuthSuccessResponse,
        models::users::UserResponse,
        models::admins::AdminResponse,
    )),
    tags(
        (name = "auth", description = "Learner authentication"),
        (name = "admin", description = "Administrator authentication"),
    )
)]
pub struct ApiDoc;
