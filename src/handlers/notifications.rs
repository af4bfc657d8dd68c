use axum::{extract::State, response::Json, response::Response};

use super::common::no_content_response;
use crate::{
    auth::AuthUser, errors::ServiceError, notifications::NotificationBadge, ApiResponse, ApiResult,
    AppState,
};

/// Recompute and return the caller's badges
#[utoipa::path(
    get,
    path = "/api/v1/notifications",
    summary = "Notification badges",
    description = "Counts of orders waiting on the caller, one badge per portal route.",
    responses(
        (status = 200, description = "Current badges", body = ApiResponse<Vec<NotificationBadge>>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "notifications"
)]
pub async fn get_notifications(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> ApiResult<Vec<NotificationBadge>> {
    let orders = state
        .services
        .order
        .visible_orders(auth_user.role.order_scope(auth_user.user_id))
        .await?;
    let badges = state
        .notifications
        .refresh(auth_user.user_id, auth_user.role, &orders);
    Ok(Json(ApiResponse::success(badges)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/notifications",
    summary = "Clear notification badges",
    responses(
        (status = 204, description = "Board cleared"),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "notifications"
)]
pub async fn clear_notifications(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Response, ServiceError> {
    state.notifications.clear(auth_user.user_id);
    Ok(no_content_response())
}
