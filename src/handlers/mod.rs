pub mod analytics;
pub mod auth;
pub mod catalog;
pub mod common;
pub mod notifications;
pub mod orders;
pub mod users;

use std::sync::Arc;

use crate::db::DbPool;
use crate::events::EventSender;
use crate::services::{
    analytics::AnalyticsService,
    catalog::{ProductModuleService, ProductService},
    orders::OrderService,
    users::UserService,
};

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub order: Arc<OrderService>,
    pub modules: Arc<ProductModuleService>,
    pub products: Arc<ProductService>,
    pub analytics: Arc<AnalyticsService>,
    pub users: Arc<UserService>,
}

impl AppServices {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        let order = Arc::new(OrderService::new(db_pool.clone(), event_sender.clone()));
        Self {
            analytics: Arc::new(AnalyticsService::new(order.clone())),
            modules: Arc::new(ProductModuleService::new(
                db_pool.clone(),
                event_sender.clone(),
            )),
            products: Arc::new(ProductService::new(db_pool.clone(), event_sender.clone())),
            users: Arc::new(UserService::new(db_pool, event_sender)),
            order,
        }
    }
}
