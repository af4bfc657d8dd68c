use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Club HX Portal API",
        version = "1.0.0",
        description = r#"
# Club HX Portal API

B2B portal for a professional beauty distributor. Salon clients request orders and
approve quotations, sales vendors prepare quotations and fulfil orders, admin staff
manage the catalog and verify payments.

## Authentication

Log in through `POST /auth/login` and send the token on every call:

```
Authorization: Bearer <your-jwt-token>
```

Tokens are backed by a server-side session that closes after a period of inactivity
or on `POST /auth/logout`.

## Order lifecycle

`quotation`/`requested` -> `pending_approval` -> `accepted` -> `processing`/`invoiced`
-> `shipped` -> `delivered` -> `payment_pending` -> `paid` -> `completed`.
`completed` is reached automatically once an order has been both delivered and paid.

## Pagination

List endpoints accept `page` (default 1) and `limit` (default 20, capped by the server).
        "#,
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "orders", description = "Orders, quotations and their lifecycle"),
        (name = "catalog", description = "Product modules and products"),
        (name = "notifications", description = "Per-user notification badges"),
        (name = "analytics", description = "Order and vendor figures"),
        (name = "users", description = "Portal accounts"),
        (name = "auth", description = "Login and sessions")
    ),
    paths(
        // Orders
        crate::handlers::orders::list_orders,
        crate::handlers::orders::create_order,
        crate::handlers::orders::orders_needing_attention,
        crate::handlers::orders::get_order,
        crate::handlers::orders::revise_order,
        crate::handlers::orders::get_order_items,
        crate::handlers::orders::add_order_item,
        crate::handlers::orders::reorder,
        crate::handlers::orders::update_order_status,
        crate::handlers::orders::attach_invoice,
        crate::handlers::orders::ship_order,
        crate::handlers::orders::tracking_update,
        crate::handlers::orders::upload_payment_proof,
        crate::handlers::orders::verify_payment,
        crate::handlers::orders::list_order_statuses,

        // Catalog
        crate::handlers::catalog::list_modules,
        crate::handlers::catalog::get_module,
        crate::handlers::catalog::list_module_products,
        crate::handlers::catalog::create_module,
        crate::handlers::catalog::update_module,
        crate::handlers::catalog::list_products,
        crate::handlers::catalog::get_product,
        crate::handlers::catalog::create_product,
        crate::handlers::catalog::update_product,

        crate::handlers::notifications::get_notifications,
        crate::handlers::notifications::clear_notifications,

        crate::handlers::analytics::order_summary,
        crate::handlers::analytics::vendor_performance,

        crate::handlers::users::create_user,

        crate::handlers::auth::login,
        crate::handlers::auth::logout,
        crate::handlers::auth::current_user,
    ),
    components(
        schemas(
            crate::errors::ErrorResponse,
            crate::models::OrderStatus,
            crate::models::TrackingStatus,
        )
    )
)]
pub struct ApiDocV1;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "Bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_document_lists_portal_routes() {
        let json = serde_json::to_string(&ApiDocV1::openapi()).unwrap();
        assert!(json.contains("Club HX Portal API"));
        assert!(json.contains("/api/v1/orders/{id}/payment-verification"));
        assert!(json.contains("/api/v1/notifications"));
        assert!(json.contains("\"Bearer\""));
    }
}
