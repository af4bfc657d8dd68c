//! Permission names checked by the route guards.
//!
//! Permissions follow the `resource:action` convention; a grant of
//! `resource:*` covers every action on that resource and `*` covers everything.

pub mod consts {
    // Orders
    pub const ORDERS_READ: &str = "orders:read";
    pub const ORDERS_CREATE: &str = "orders:create";
    pub const ORDERS_UPDATE: &str = "orders:update";
    pub const ORDERS_STATUS: &str = "orders:status";
    pub const ORDERS_FULFILL: &str = "orders:fulfill";
    pub const ORDERS_PAY: &str = "orders:pay";

    // Payments
    pub const PAYMENTS_VERIFY: &str = "payments:verify";

    // Catalog (product modules and products)
    pub const CATALOG_READ: &str = "catalog:read";
    pub const CATALOG_MANAGE: &str = "catalog:manage";

    pub const NOTIFICATIONS_READ: &str = "notifications:read";

    // Analytics
    pub const ANALYTICS_READ: &str = "analytics:read";
    pub const ANALYTICS_VENDORS: &str = "analytics:vendors";

    pub const USERS_MANAGE: &str = "users:manage";
}

/// True when `granted` covers `required`.
pub fn permission_matches(granted: &str, required: &str) -> bool {
    if granted == "*" || granted == required {
        return true;
    }
    match granted.strip_suffix('*') {
        Some(prefix) if prefix.ends_with(':') => required.starts_with(prefix),
        _ => false,
    }
}
