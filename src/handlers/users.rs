use axum::{
    extract::State,
    response::{Json, Response},
};

use super::common::{created_response, validate_input};
use crate::{
    errors::ServiceError,
    services::users::{CreateUserRequest, UserResponse},
    ApiResponse, AppState,
};

/// Create a portal account (admin only)
#[utoipa::path(
    post,
    path = "/api/v1/users",
    summary = "Create user",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = ApiResponse<UserResponse>),
        (status = 400, description = "Invalid request data", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 409, description = "Email already registered", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "users"
)]
pub async fn create_user(
    State(state): State<AppState>,
    Json(request): Json<CreateUserRequest>,
) -> Result<Response, ServiceError> {
    if let Err(rejection) = validate_input(&request) {
        return Ok(rejection);
    }
    let user = state.services.users.create_user(request).await?;
    Ok(created_response(user))
}
