use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use strum::Display;
use tracing::debug;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::Role;
use crate::models::{Order, OrderStatus};

/// What a badge is counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, ToSchema)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NotificationKind {
    OrderRequest,
    PaymentReview,
    AwaitingPayment,
    QuotationRejected,
    QuotationOpen,
    QuotationReview,
    Shipment,
    PaymentDue,
}

/// A counter shown next to a portal route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct NotificationBadge {
    pub count: usize,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub route: String,
    pub updated_at: DateTime<Utc>,
}

/// Badges keyed by route.
///
/// A route holds a single badge: pushing a second one for the same route
/// replaces the first, counts are not merged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationBoard {
    badges: BTreeMap<String, NotificationBadge>,
}

impl NotificationBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a badge. Zero counts are not shown and leave the board untouched.
    pub fn push(
        &mut self,
        route: &str,
        kind: NotificationKind,
        count: usize,
        now: DateTime<Utc>,
    ) {
        if count == 0 {
            return;
        }
        self.badges.insert(
            route.to_string(),
            NotificationBadge {
                count,
                kind,
                route: route.to_string(),
                updated_at: now,
            },
        );
    }

    pub fn get(&self, route: &str) -> Option<&NotificationBadge> {
        self.badges.get(route)
    }

    pub fn badges(&self) -> Vec<NotificationBadge> {
        self.badges.values().cloned().collect()
    }

    pub fn clear(&mut self) {
        self.badges.clear();
    }
}

/// Turns the orders a user can see into badges on their board.
pub trait NotificationAggregator: Send + Sync {
    fn aggregate(&self, orders: &[Order], board: &mut NotificationBoard, now: DateTime<Utc>);
}

fn count(orders: &[Order], statuses: &[OrderStatus]) -> usize {
    orders
        .iter()
        .filter(|order| statuses.contains(&order.status))
        .count()
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AdminNotifications;

impl NotificationAggregator for AdminNotifications {
    fn aggregate(&self, orders: &[Order], board: &mut NotificationBoard, now: DateTime<Utc>) {
        board.push(
            "/admin/orders",
            NotificationKind::OrderRequest,
            count(orders, &[OrderStatus::Requested]),
            now,
        );
        // same route as above: payment reviews win when both are present
        board.push(
            "/admin/orders",
            NotificationKind::PaymentReview,
            count(orders, &[OrderStatus::PaymentPending]),
            now,
        );
        board.push(
            "/admin/payments",
            NotificationKind::AwaitingPayment,
            count(orders, &[OrderStatus::Delivered]),
            now,
        );
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SalesNotifications;

impl NotificationAggregator for SalesNotifications {
    fn aggregate(&self, orders: &[Order], board: &mut NotificationBoard, now: DateTime<Utc>) {
        board.push(
            "/sales/orders",
            NotificationKind::OrderRequest,
            count(orders, &[OrderStatus::Requested]),
            now,
        );
        board.push(
            "/sales/orders",
            NotificationKind::QuotationRejected,
            count(orders, &[OrderStatus::Rejected]),
            now,
        );
        board.push(
            "/sales/quotations",
            NotificationKind::QuotationOpen,
            count(orders, &[OrderStatus::Quotation]),
            now,
        );
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ClientNotifications;

impl NotificationAggregator for ClientNotifications {
    fn aggregate(&self, orders: &[Order], board: &mut NotificationBoard, now: DateTime<Utc>) {
        board.push(
            "/client/quotations",
            NotificationKind::QuotationReview,
            count(
                orders,
                &[OrderStatus::Quotation, OrderStatus::PendingApproval],
            ),
            now,
        );
        board.push(
            "/client/orders",
            NotificationKind::Shipment,
            count(orders, &[OrderStatus::Shipped]),
            now,
        );
        board.push(
            "/client/orders",
            NotificationKind::PaymentDue,
            count(orders, &[OrderStatus::Delivered]),
            now,
        );
    }
}

/// Per-user boards shared across request handlers.
#[derive(Debug, Clone, Default)]
pub struct NotificationHub {
    boards: Arc<DashMap<Uuid, NotificationBoard>>,
}

impl NotificationHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds the user's board from `orders` and returns its badges.
    pub fn refresh(&self, user_id: Uuid, role: Role, orders: &[Order]) -> Vec<NotificationBadge> {
        self.refresh_at(user_id, role, orders, Utc::now())
    }

    pub fn refresh_at(
        &self,
        user_id: Uuid,
        role: Role,
        orders: &[Order],
        now: DateTime<Utc>,
    ) -> Vec<NotificationBadge> {
        let mut board = self.boards.entry(user_id).or_default();
        board.clear();
        role.notification_aggregator()
            .aggregate(orders, &mut board, now);
        debug!(%user_id, %role, badges = board.badges.len(), "notification board refreshed");
        board.badges()
    }

    pub fn snapshot(&self, user_id: Uuid) -> Vec<NotificationBadge> {
        self.boards
            .get(&user_id)
            .map(|board| board.badges())
            .unwrap_or_default()
    }

    pub fn clear(&self, user_id: Uuid) {
        if let Some(mut board) = self.boards.get_mut(&user_id) {
            board.clear();
        }
    }
}
