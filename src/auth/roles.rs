use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};
use utoipa::ToSchema;
use uuid::Uuid;

use super::permissions::{consts as perm, permission_matches};
use crate::models::{OrderAuthor, OrderScope, OrderStatus};
use crate::notifications::{
    AdminNotifications, ClientNotifications, NotificationAggregator, SalesNotifications,
};

/// The three kinds of portal users. Every role-dependent decision goes
/// through a method on this type.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    Admin,
    Sales,
    Client,
}

const ADMIN_PERMISSIONS: &[&str] = &["*"];

const SALES_PERMISSIONS: &[&str] = &[
    perm::ORDERS_READ,
    perm::ORDERS_CREATE,
    perm::ORDERS_UPDATE,
    perm::ORDERS_STATUS,
    perm::ORDERS_FULFILL,
    perm::CATALOG_READ,
    perm::NOTIFICATIONS_READ,
    perm::ANALYTICS_READ,
];

const CLIENT_PERMISSIONS: &[&str] = &[
    perm::ORDERS_READ,
    perm::ORDERS_CREATE,
    perm::ORDERS_UPDATE,
    perm::ORDERS_STATUS,
    perm::ORDERS_PAY,
    perm::CATALOG_READ,
    perm::NOTIFICATIONS_READ,
    perm::ANALYTICS_READ,
];

impl Role {
    pub fn permissions(self) -> &'static [&'static str] {
        match self {
            Role::Admin => ADMIN_PERMISSIONS,
            Role::Sales => SALES_PERMISSIONS,
            Role::Client => CLIENT_PERMISSIONS,
        }
    }

    pub fn grants(self, permission: &str) -> bool {
        self.permissions()
            .iter()
            .any(|granted| permission_matches(granted, permission))
    }

    pub fn order_scope(self, user_id: Uuid) -> OrderScope {
        match self {
            Role::Admin => OrderScope::All,
            Role::Sales => OrderScope::Vendor(user_id),
            Role::Client => OrderScope::Customer(user_id),
        }
    }

    /// Staff write orders on the sales side of the relationship.
    pub fn order_author(self) -> OrderAuthor {
        match self {
            Role::Admin | Role::Sales => OrderAuthor::Sales,
            Role::Client => OrderAuthor::Client,
        }
    }

    /// Statuses this role may request directly. `Completed` is never among
    /// them: it is only reached through auto-completion.
    pub fn can_set_status(self, status: OrderStatus) -> bool {
        if status == OrderStatus::Completed {
            return false;
        }
        match self {
            Role::Admin => true,
            Role::Sales => matches!(
                status,
                OrderStatus::Quotation
                    | OrderStatus::PendingApproval
                    | OrderStatus::Accepted
                    | OrderStatus::Rejected
                    | OrderStatus::Canceled
                    | OrderStatus::Processing
                    | OrderStatus::Invoiced
                    | OrderStatus::Shipped
            ),
            Role::Client => matches!(
                status,
                OrderStatus::Accepted | OrderStatus::Rejected | OrderStatus::Canceled
            ),
        }
    }

    /// Direct status change from `from` to `to`. Clients answer quotations
    /// and revisions, and may only cancel before the goods leave.
    pub fn can_transition(self, from: OrderStatus, to: OrderStatus) -> bool {
        if !self.can_set_status(to) {
            return false;
        }
        match (self, to) {
            (Role::Client, OrderStatus::Accepted | OrderStatus::Rejected) => matches!(
                from,
                OrderStatus::Quotation | OrderStatus::PendingApproval
            ),
            (Role::Client, OrderStatus::Canceled) => matches!(
                from,
                OrderStatus::Quotation
                    | OrderStatus::Requested
                    | OrderStatus::PendingApproval
                    | OrderStatus::Accepted
                    | OrderStatus::Processing
                    | OrderStatus::Invoiced
            ),
            _ => true,
        }
    }

    pub fn notification_aggregator(self) -> &'static dyn NotificationAggregator {
        match self {
            Role::Admin => &AdminNotifications,
            Role::Sales => &SalesNotifications,
            Role::Client => &ClientNotifications,
        }
    }
}
