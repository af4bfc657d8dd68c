use axum::{
    extract::{Path, Query, State},
    response::{Json, Response},
};
use uuid::Uuid;

use super::common::{created_response, validate_input};
use crate::{
    auth::AuthUser,
    errors::ServiceError,
    models::{Order, OrderLine, StatusMetadata},
    services::orders::{
        AttachInvoiceRequest, CreateOrderRequest, OrderFilter, OrderLineInput,
        PaymentProofRequest, PaymentVerificationRequest, ReviseOrderRequest, ShipOrderRequest,
        TrackingUpdateRequest, UpdateStatusRequest,
    },
    ApiResponse, ApiResult, AppState, ListQuery, PaginatedResponse,
};

/// List orders visible to the caller
#[utoipa::path(
    get,
    path = "/api/v1/orders",
    summary = "List orders",
    description = "Paginated orders in the caller's scope, newest first. Admins see all orders, sales vendors their own, clients theirs.",
    params(ListQuery, OrderFilter),
    responses(
        (status = 200, description = "Orders retrieved successfully", body = ApiResponse<PaginatedResponse<Order>>,
            headers(("X-Request-Id" = String, description = "Unique request id"))
        ),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
    Query(filter): Query<OrderFilter>,
    auth_user: AuthUser,
) -> ApiResult<PaginatedResponse<Order>> {
    let (page, limit) = state.page_params(&query);
    let (items, total) = state
        .services
        .order
        .list_orders(auth_user.role.order_scope(auth_user.user_id), &filter, page, limit)
        .await?;
    Ok(Json(ApiResponse::success(PaginatedResponse::new(
        items, total, page, limit,
    ))))
}

/// Create an order or quotation
#[utoipa::path(
    post,
    path = "/api/v1/orders",
    summary = "Create order",
    description = "Clients create order requests (status `requested`); sales and admin create quotations (status `quotation`).",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order created successfully", body = ApiResponse<Order>),
        (status = 400, description = "Invalid request data", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "orders"
)]
pub async fn create_order(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(request): Json<CreateOrderRequest>,
) -> Result<Response, ServiceError> {
    if let Err(rejection) = validate_input(&request) {
        return Ok(rejection);
    }
    let order = state.services.order.create_order(&auth_user, request).await?;
    Ok(created_response(order))
}

#[utoipa::path(
    get,
    path = "/api/v1/orders/attention",
    summary = "Orders needing attention",
    description = "Orders in `payment_pending`, `requested` or `quotation`, newest first.",
    responses(
        (status = 200, description = "Orders retrieved successfully", body = ApiResponse<Vec<Order>>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "orders"
)]
pub async fn orders_needing_attention(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> ApiResult<Vec<Order>> {
    let orders = state
        .services
        .order
        .orders_needing_attention(auth_user.role.order_scope(auth_user.user_id))
        .await?;
    Ok(Json(ApiResponse::success(orders)))
}

#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}",
    summary = "Get order",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order retrieved successfully", body = ApiResponse<Order>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth_user: AuthUser,
) -> ApiResult<Order> {
    let order = state
        .services
        .order
        .get_order(auth_user.role.order_scope(auth_user.user_id), id)
        .await?;
    Ok(Json(ApiResponse::success(order)))
}

/// Revise lines or notes of an order that is still being negotiated
#[utoipa::path(
    put,
    path = "/api/v1/orders/{id}",
    summary = "Revise order",
    description = "Allowed while the order is `quotation`, `requested` or `pending_approval`. A revision by sales sends the order to `pending_approval`.",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = ReviseOrderRequest,
    responses(
        (status = 200, description = "Order revised", body = ApiResponse<Order>),
        (status = 400, description = "Order can no longer be edited", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "orders"
)]
pub async fn revise_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth_user: AuthUser,
    Json(request): Json<ReviseOrderRequest>,
) -> ApiResult<Order> {
    let order = state
        .services
        .order
        .revise_order(&auth_user, id, request)
        .await?;
    Ok(Json(ApiResponse::success(order)))
}

#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}/items",
    summary = "List order items",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Items retrieved", body = ApiResponse<Vec<OrderLine>>),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "orders"
)]
pub async fn get_order_items(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth_user: AuthUser,
) -> ApiResult<Vec<OrderLine>> {
    let items = state
        .services
        .order
        .get_order_items(auth_user.role.order_scope(auth_user.user_id), id)
        .await?;
    Ok(Json(ApiResponse::success(items)))
}

#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/items",
    summary = "Add order item",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = OrderLineInput,
    responses(
        (status = 201, description = "Item added", body = ApiResponse<Order>),
        (status = 400, description = "Invalid item or order not editable", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "orders"
)]
pub async fn add_order_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth_user: AuthUser,
    Json(line): Json<OrderLineInput>,
) -> Result<Response, ServiceError> {
    if let Err(rejection) = validate_input(&line) {
        return Ok(rejection);
    }
    let order = state
        .services
        .order
        .add_order_item(&auth_user, id, line)
        .await?;
    Ok(created_response(order))
}

#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/reorder",
    summary = "Reorder",
    description = "Creates a new order with the same lines, linked through `original_order_id`.",
    params(("id" = Uuid, Path, description = "Order to copy")),
    responses(
        (status = 201, description = "Order created", body = ApiResponse<Order>),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "orders"
)]
pub async fn reorder(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth_user: AuthUser,
) -> Result<Response, ServiceError> {
    let order = state.services.order.reorder(&auth_user, id).await?;
    Ok(created_response(order))
}

/// Set an order status directly
#[utoipa::path(
    put,
    path = "/api/v1/orders/{id}/status",
    summary = "Update order status",
    description = "The allowed targets depend on the caller's role. `completed` is never accepted: orders complete automatically once delivered and paid.",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = ApiResponse<Order>),
        (status = 400, description = "Invalid status or finished order", body = crate::errors::ErrorResponse),
        (status = 403, description = "Status not allowed for role", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "orders"
)]
pub async fn update_order_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth_user: AuthUser,
    Json(request): Json<UpdateStatusRequest>,
) -> ApiResult<Order> {
    let order = state
        .services
        .order
        .set_status(&auth_user, id, request.status)
        .await?;
    Ok(Json(ApiResponse::success(order)))
}

#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/invoice",
    summary = "Attach invoice",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = AttachInvoiceRequest,
    responses(
        (status = 200, description = "Order invoiced", body = ApiResponse<Order>),
        (status = 400, description = "Invalid request or finished order", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "orders"
)]
pub async fn attach_invoice(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth_user: AuthUser,
    Json(request): Json<AttachInvoiceRequest>,
) -> ApiResult<Order> {
    let order = state
        .services
        .order
        .attach_invoice(&auth_user, id, request)
        .await?;
    Ok(Json(ApiResponse::success(order)))
}

#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/shipment",
    summary = "Ship order",
    description = "Records carrier and tracking number and moves the order to `shipped`.",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = ShipOrderRequest,
    responses(
        (status = 200, description = "Order shipped", body = ApiResponse<Order>),
        (status = 400, description = "Invalid request or finished order", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "orders"
)]
pub async fn ship_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth_user: AuthUser,
    Json(request): Json<ShipOrderRequest>,
) -> ApiResult<Order> {
    let order = state.services.order.ship(&auth_user, id, request).await?;
    Ok(Json(ApiResponse::success(order)))
}

#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/tracking",
    summary = "Carrier tracking update",
    description = "A `delivered` update on a shipped order marks it delivered; every other update leaves the order as is.",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = TrackingUpdateRequest,
    responses(
        (status = 200, description = "Order after the update", body = ApiResponse<Order>),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "orders"
)]
pub async fn tracking_update(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth_user: AuthUser,
    Json(request): Json<TrackingUpdateRequest>,
) -> ApiResult<Order> {
    let order = state
        .services
        .order
        .tracking_update(&auth_user, id, request.status)
        .await?;
    Ok(Json(ApiResponse::success(order)))
}

#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/payment-proof",
    summary = "Upload payment proof",
    description = "Attaches the proof and moves the order to `payment_pending`. A new upload replaces the previous proof.",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = PaymentProofRequest,
    responses(
        (status = 200, description = "Proof recorded", body = ApiResponse<Order>),
        (status = 400, description = "Invalid request or finished order", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "orders"
)]
pub async fn upload_payment_proof(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth_user: AuthUser,
    Json(request): Json<PaymentProofRequest>,
) -> ApiResult<Order> {
    let order = state
        .services
        .order
        .upload_payment_proof(&auth_user, id, request)
        .await?;
    Ok(Json(ApiResponse::success(order)))
}

#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/payment-verification",
    summary = "Verify payment",
    description = "A positive verification of a `payment_pending` order marks it paid, completing it when it was already delivered.",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = PaymentVerificationRequest,
    responses(
        (status = 200, description = "Order after verification", body = ApiResponse<Order>),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "orders"
)]
pub async fn verify_payment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth_user: AuthUser,
    Json(request): Json<PaymentVerificationRequest>,
) -> ApiResult<Order> {
    let order = state
        .services
        .order
        .verify_payment(&auth_user, id, request.verified)
        .await?;
    Ok(Json(ApiResponse::success(order)))
}

/// Display metadata for every order status
#[utoipa::path(
    get,
    path = "/api/v1/order-statuses",
    summary = "Order status catalogue",
    responses(
        (status = 200, description = "Status labels, colors and progress", body = ApiResponse<Vec<StatusMetadata>>),
    ),
    security(("Bearer" = [])),
    tag = "orders"
)]
pub async fn list_order_statuses() -> ApiResult<Vec<StatusMetadata>> {
    Ok(Json(ApiResponse::success(
        crate::models::OrderStatus::all_metadata(),
    )))
}
