//! Club HX API Library
//!
//! Order, catalog and notification services behind the Club HX B2B portal.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod health;
pub mod middleware_helpers;
pub mod migrator;
pub mod models;
pub mod notifications;
pub mod openapi;
pub mod services;
pub mod tracing;

use axum::{
    response::Json,
    routing::{get, post, put},
    Extension, Router,
};
use chrono::Utc;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::{compression::CompressionLayer, timeout::TimeoutLayer};
use utoipa::{IntoParams, ToSchema};

use crate::auth::consts as perm;
use crate::auth::{AuthConfig, AuthRouterExt, AuthService};
use crate::notifications::NotificationHub;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub event_sender: Option<Arc<events::EventSender>>,
    pub auth: Arc<AuthService>,
    pub notifications: NotificationHub,
    pub services: handlers::AppServices,
}

impl AppState {
    /// Wires services, auth and the notification hub around one connection.
    pub fn new(
        db: Arc<DatabaseConnection>,
        config: config::AppConfig,
        event_sender: Option<Arc<events::EventSender>>,
    ) -> Self {
        let auth = Arc::new(AuthService::new(AuthConfig::from_app_config(&config)));
        let services = handlers::AppServices::new(db.clone(), event_sender.clone());
        Self {
            db,
            config,
            event_sender,
            auth,
            notifications: NotificationHub::new(),
            services,
        }
    }

    /// Resolves `(page, limit)` with the configured default and ceiling.
    pub fn page_params(&self, query: &ListQuery) -> (u64, u64) {
        let page = query.page.unwrap_or(1).max(1);
        (page, self.config.page_limit(query.limit))
    }
}

/// Common pagination parameters for list endpoints
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct ListQuery {
    /// 1-based page number
    pub page: Option<u64>,
    /// Page size, clamped to the configured maximum
    pub limit: Option<u64>,
}

// Common response wrappers
#[derive(Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    pub errors: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            request_id: crate::tracing::current_request_id().map(|rid| rid.as_str().to_string()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
}

impl<T> PaginatedResponse<T> {
    pub fn new(items: Vec<T>, total: u64, page: u64, limit: u64) -> Self {
        let total_pages = if limit == 0 { 0 } else { total.div_ceil(limit) };
        Self {
            items,
            total,
            page,
            limit,
            total_pages,
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            errors: None,
            meta: Some(ResponseMeta::capture()),
        }
    }

    pub fn validation_errors(errors: Vec<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some("Validation failed".to_string()),
            errors: Some(errors),
            meta: Some(ResponseMeta::capture()),
        }
    }
}

#[cfg(test)]
mod response_tests {
    use super::*;
    use chrono::DateTime;

    #[tokio::test]
    async fn success_response_includes_request_metadata() {
        let response =
            crate::tracing::scope_request_id(crate::tracing::RequestId::new("meta-123"), async {
                ApiResponse::success("ok")
            })
            .await;

        let meta = response.meta.expect("metadata expected");
        assert_eq!(meta.request_id.as_deref(), Some("meta-123"));
        DateTime::parse_from_rfc3339(&meta.timestamp).expect("timestamp should parse");
    }

    #[tokio::test]
    async fn validation_errors_response_includes_metadata() {
        let response = crate::tracing::scope_request_id(
            crate::tracing::RequestId::new("meta-validation"),
            async { ApiResponse::<()>::validation_errors(vec!["missing".into()]) },
        )
        .await;

        let meta = response.meta.expect("metadata expected");
        assert_eq!(meta.request_id.as_deref(), Some("meta-validation"));
        assert_eq!(response.errors, Some(vec!["missing".to_string()]));
    }

    #[test]
    fn total_pages_rounds_up() {
        let page = PaginatedResponse::new(vec![1, 2, 3], 41, 1, 20);
        assert_eq!(page.total_pages, 3);

        let empty = PaginatedResponse::<u8>::new(vec![], 0, 1, 20);
        assert_eq!(empty.total_pages, 0);
    }
}

/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

/// Routes mounted under `/api/v1`, each group behind auth plus its permission.
pub fn api_v1_routes() -> Router<AppState> {
    let orders_read = Router::new()
        .route("/orders", get(handlers::orders::list_orders))
        .route(
            "/orders/attention",
            get(handlers::orders::orders_needing_attention),
        )
        .route("/orders/:id", get(handlers::orders::get_order))
        .route("/orders/:id/items", get(handlers::orders::get_order_items))
        .route("/order-statuses", get(handlers::orders::list_order_statuses))
        .with_permission(perm::ORDERS_READ);

    let orders_create = Router::new()
        .route("/orders", post(handlers::orders::create_order))
        .route("/orders/:id/reorder", post(handlers::orders::reorder))
        .with_permission(perm::ORDERS_CREATE);

    let orders_update = Router::new()
        .route("/orders/:id", put(handlers::orders::revise_order))
        .route("/orders/:id/items", post(handlers::orders::add_order_item))
        .with_permission(perm::ORDERS_UPDATE);

    let orders_status = Router::new()
        .route(
            "/orders/:id/status",
            put(handlers::orders::update_order_status),
        )
        .with_permission(perm::ORDERS_STATUS);

    let orders_fulfill = Router::new()
        .route("/orders/:id/invoice", post(handlers::orders::attach_invoice))
        .route("/orders/:id/shipment", post(handlers::orders::ship_order))
        .route("/orders/:id/tracking", post(handlers::orders::tracking_update))
        .with_permission(perm::ORDERS_FULFILL);

    let orders_pay = Router::new()
        .route(
            "/orders/:id/payment-proof",
            post(handlers::orders::upload_payment_proof),
        )
        .with_permission(perm::ORDERS_PAY);

    let payments_verify = Router::new()
        .route(
            "/orders/:id/payment-verification",
            post(handlers::orders::verify_payment),
        )
        .with_permission(perm::PAYMENTS_VERIFY);

    let catalog_read = Router::new()
        .route("/modules", get(handlers::catalog::list_modules))
        .route("/modules/:id", get(handlers::catalog::get_module))
        .route(
            "/modules/:id/products",
            get(handlers::catalog::list_module_products),
        )
        .route("/products", get(handlers::catalog::list_products))
        .route("/products/:id", get(handlers::catalog::get_product))
        .with_permission(perm::CATALOG_READ);

    let catalog_manage = Router::new()
        .route("/modules", post(handlers::catalog::create_module))
        .route("/modules/:id", put(handlers::catalog::update_module))
        .route("/products", post(handlers::catalog::create_product))
        .route("/products/:id", put(handlers::catalog::update_product))
        .with_permission(perm::CATALOG_MANAGE);

    let notifications = Router::new()
        .route(
            "/notifications",
            get(handlers::notifications::get_notifications)
                .delete(handlers::notifications::clear_notifications),
        )
        .with_permission(perm::NOTIFICATIONS_READ);

    let analytics_read = Router::new()
        .route("/analytics/orders", get(handlers::analytics::order_summary))
        .with_permission(perm::ANALYTICS_READ);

    let analytics_vendors = Router::new()
        .route(
            "/analytics/vendors",
            get(handlers::analytics::vendor_performance),
        )
        .with_permission(perm::ANALYTICS_VENDORS);

    let users = Router::new()
        .route("/users", post(handlers::users::create_user))
        .with_permission(perm::USERS_MANAGE);

    Router::new()
        .merge(orders_read)
        .merge(orders_create)
        .merge(orders_update)
        .merge(orders_status)
        .merge(orders_fulfill)
        .merge(orders_pay)
        .merge(payments_verify)
        .merge(catalog_read)
        .merge(catalog_manage)
        .merge(notifications)
        .merge(analytics_read)
        .merge(analytics_vendors)
        .merge(users)
}

/// Full application router without CORS, which depends on deployment config.
pub fn app_router(state: AppState) -> Router {
    let auth_service = state.auth.clone();
    let request_timeout = state.config.request_timeout();

    Router::new()
        .nest("/api/v1", api_v1_routes())
        .nest("/auth", handlers::auth::auth_routes())
        .with_state(state.clone())
        .nest("/health", health::health_routes(state.db.clone()))
        .merge(openapi::swagger_ui())
        .layer(Extension(auth_service))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(CompressionLayer::new())
        .layer(crate::tracing::configure_http_tracing())
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id::request_id_middleware,
        ))
}
