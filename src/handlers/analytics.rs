use axum::{extract::State, response::Json};

use crate::{
    auth::AuthUser,
    services::analytics::{OrderSummary, VendorPerformance},
    ApiResponse, ApiResult, AppState,
};

#[utoipa::path(
    get,
    path = "/api/v1/analytics/orders",
    summary = "Order summary",
    description = "Counts per status, revenue and attention figures over the caller's orders.",
    responses(
        (status = 200, description = "Summary computed", body = ApiResponse<OrderSummary>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "analytics"
)]
pub async fn order_summary(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> ApiResult<OrderSummary> {
    let summary = state
        .services
        .analytics
        .order_summary(auth_user.role.order_scope(auth_user.user_id))
        .await?;
    Ok(Json(ApiResponse::success(summary)))
}

#[utoipa::path(
    get,
    path = "/api/v1/analytics/vendors",
    summary = "Vendor performance",
    responses(
        (status = 200, description = "Per-vendor figures, highest revenue first", body = ApiResponse<Vec<VendorPerformance>>),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "analytics"
)]
pub async fn vendor_performance(State(state): State<AppState>) -> ApiResult<Vec<VendorPerformance>> {
    let rows = state.services.analytics.vendor_performance().await?;
    Ok(Json(ApiResponse::success(rows)))
}
