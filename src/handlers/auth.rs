use axum::{
    extract::State,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    auth::{AuthError, AuthRouterExt, AuthUser, TokenResponse},
    errors::ServiceError,
    AppState,
};

/// Login request payload
#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(length(min = 1))]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

pub fn auth_routes() -> Router<AppState> {
    let session = Router::new()
        .route("/logout", post(logout))
        .route("/me", get(current_user))
        .with_auth();

    Router::new().route("/login", post(login)).merge(session)
}

/// Exchange credentials for an access token
#[utoipa::path(
    post,
    path = "/auth/login",
    summary = "Log in",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token issued and session opened", body = TokenResponse),
        (status = 401, description = "Invalid credentials"),
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, AuthError> {
    payload.validate().map_err(|_| AuthError::InvalidCredentials)?;

    let user = state
        .services
        .users
        .authenticate(&payload.email, &payload.password)
        .await
        .map_err(|e| match e {
            ServiceError::Unauthorized(_) => AuthError::InvalidCredentials,
            other => AuthError::InternalError(other.to_string()),
        })?;

    let token = state
        .auth
        .issue_token(user.id, &user.name, &user.email, user.role)?;
    info!(user_id = %user.id, role = %user.role, "user logged in");
    Ok(Json(token))
}

/// End the session behind the presented token
#[utoipa::path(
    post,
    path = "/auth/logout",
    summary = "Log out",
    responses(
        (status = 200, description = "Session closed"),
        (status = 401, description = "Missing or expired session"),
    ),
    security(("Bearer" = [])),
    tag = "auth"
)]
pub async fn logout(State(state): State<AppState>, auth_user: AuthUser) -> Json<Value> {
    state.auth.end_session(&auth_user.token_id);
    info!(user_id = %auth_user.user_id, "user logged out");
    Json(json!({ "message": "Successfully logged out" }))
}

#[utoipa::path(
    get,
    path = "/auth/me",
    summary = "Current user",
    responses(
        (status = 200, description = "The authenticated caller", body = AuthUser),
        (status = 401, description = "Missing or expired session"),
    ),
    security(("Bearer" = [])),
    tag = "auth"
)]
pub async fn current_user(auth_user: AuthUser) -> Json<AuthUser> {
    Json(auth_user)
}
