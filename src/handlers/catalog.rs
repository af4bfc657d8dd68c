//! Product modules and products.
//!
//! Admins also see inactive entries; everyone else only sees active ones.

use axum::{
    extract::{Path, Query, State},
    response::{Json, Response},
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use super::common::{created_response, validate_input};
use crate::{
    auth::AuthUser,
    errors::ServiceError,
    services::catalog::{
        CreateModuleRequest, CreateProductRequest, ProductFilter, ProductModuleResponse,
        ProductResponse, ProductSort, UpdateModuleRequest, UpdateProductRequest,
    },
    ApiResponse, ApiResult, AppState, ListQuery, PaginatedResponse,
};

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SortQuery {
    /// One of name_asc, name_desc, price_asc, price_desc, newest, stock_desc
    pub sort: Option<ProductSort>,
}

#[utoipa::path(
    get,
    path = "/api/v1/modules",
    summary = "List product modules",
    params(ListQuery),
    responses(
        (status = 200, description = "Modules retrieved", body = ApiResponse<PaginatedResponse<ProductModuleResponse>>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "catalog"
)]
pub async fn list_modules(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
    auth_user: AuthUser,
) -> ApiResult<PaginatedResponse<ProductModuleResponse>> {
    let (page, limit) = state.page_params(&query);
    let (items, total) = state
        .services
        .modules
        .list_modules(auth_user.is_admin(), page, limit)
        .await?;
    Ok(Json(ApiResponse::success(PaginatedResponse::new(
        items, total, page, limit,
    ))))
}

#[utoipa::path(
    get,
    path = "/api/v1/modules/{id}",
    summary = "Get product module",
    params(("id" = Uuid, Path, description = "Module ID")),
    responses(
        (status = 200, description = "Module retrieved", body = ApiResponse<ProductModuleResponse>),
        (status = 404, description = "Module not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "catalog"
)]
pub async fn get_module(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth_user: AuthUser,
) -> ApiResult<ProductModuleResponse> {
    let module = state
        .services
        .modules
        .get_module(id, auth_user.is_admin())
        .await?;
    Ok(Json(ApiResponse::success(module)))
}

#[utoipa::path(
    get,
    path = "/api/v1/modules/{id}/products",
    summary = "List products of a module",
    params(("id" = Uuid, Path, description = "Module ID")),
    responses(
        (status = 200, description = "Products retrieved", body = ApiResponse<Vec<ProductResponse>>),
        (status = 404, description = "Module not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "catalog"
)]
pub async fn list_module_products(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth_user: AuthUser,
) -> ApiResult<Vec<ProductResponse>> {
    let products = state
        .services
        .modules
        .module_products(id, auth_user.is_admin())
        .await?;
    Ok(Json(ApiResponse::success(products)))
}

#[utoipa::path(
    post,
    path = "/api/v1/modules",
    summary = "Create product module",
    request_body = CreateModuleRequest,
    responses(
        (status = 201, description = "Module created", body = ApiResponse<ProductModuleResponse>),
        (status = 400, description = "Invalid request data", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "catalog"
)]
pub async fn create_module(
    State(state): State<AppState>,
    Json(request): Json<CreateModuleRequest>,
) -> Result<Response, ServiceError> {
    if let Err(rejection) = validate_input(&request) {
        return Ok(rejection);
    }
    let module = state.services.modules.create_module(request).await?;
    Ok(created_response(module))
}

#[utoipa::path(
    put,
    path = "/api/v1/modules/{id}",
    summary = "Update product module",
    params(("id" = Uuid, Path, description = "Module ID")),
    request_body = UpdateModuleRequest,
    responses(
        (status = 200, description = "Module updated", body = ApiResponse<ProductModuleResponse>),
        (status = 404, description = "Module not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "catalog"
)]
pub async fn update_module(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateModuleRequest>,
) -> ApiResult<ProductModuleResponse> {
    let module = state.services.modules.update_module(id, request).await?;
    Ok(Json(ApiResponse::success(module)))
}

#[utoipa::path(
    get,
    path = "/api/v1/products",
    summary = "List products",
    description = "Filtered, sorted and paginated catalog.",
    params(ListQuery, ProductFilter, SortQuery),
    responses(
        (status = 200, description = "Products retrieved", body = ApiResponse<PaginatedResponse<ProductResponse>>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "catalog"
)]
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
    Query(filter): Query<ProductFilter>,
    Query(sort): Query<SortQuery>,
    auth_user: AuthUser,
) -> ApiResult<PaginatedResponse<ProductResponse>> {
    let (page, limit) = state.page_params(&query);
    let (items, total) = state
        .services
        .products
        .list_products(
            &filter,
            sort.sort.unwrap_or_default(),
            auth_user.is_admin(),
            page,
            limit,
        )
        .await?;
    Ok(Json(ApiResponse::success(PaginatedResponse::new(
        items, total, page, limit,
    ))))
}

#[utoipa::path(
    get,
    path = "/api/v1/products/{id}",
    summary = "Get product",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product retrieved", body = ApiResponse<ProductResponse>),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "catalog"
)]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth_user: AuthUser,
) -> ApiResult<ProductResponse> {
    let product = state
        .services
        .products
        .get_product(id, auth_user.is_admin())
        .await?;
    Ok(Json(ApiResponse::success(product)))
}

#[utoipa::path(
    post,
    path = "/api/v1/products",
    summary = "Create product",
    request_body = CreateProductRequest,
    responses(
        (status = 201, description = "Product created", body = ApiResponse<ProductResponse>),
        (status = 400, description = "Invalid request data", body = crate::errors::ErrorResponse),
        (status = 409, description = "SKU already exists", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "catalog"
)]
pub async fn create_product(
    State(state): State<AppState>,
    Json(request): Json<CreateProductRequest>,
) -> Result<Response, ServiceError> {
    if let Err(rejection) = validate_input(&request) {
        return Ok(rejection);
    }
    let product = state.services.products.create_product(request).await?;
    Ok(created_response(product))
}

#[utoipa::path(
    put,
    path = "/api/v1/products/{id}",
    summary = "Update product",
    params(("id" = Uuid, Path, description = "Product ID")),
    request_body = UpdateProductRequest,
    responses(
        (status = 200, description = "Product updated", body = ApiResponse<ProductResponse>),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "catalog"
)]
pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateProductRequest>,
) -> ApiResult<ProductResponse> {
    let product = state.services.products.update_product(id, request).await?;
    Ok(Json(ApiResponse::success(product)))
}
