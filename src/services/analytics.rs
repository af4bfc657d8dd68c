use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use tracing::instrument;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    errors::ServiceError,
    models::{Order, OrderScope, OrderStatus},
    services::orders::OrderService,
};

/// Order figures over everything the caller can see.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct OrderSummary {
    pub total_orders: u64,
    /// Count per status, every status present (zero included)
    pub by_status: BTreeMap<String, u64>,
    /// Sum of totals over paid and completed orders
    pub revenue: Decimal,
    pub average_order_value: Decimal,
    pub needing_attention: u64,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct VendorPerformance {
    pub vendor_id: Uuid,
    pub orders: u64,
    pub completed: u64,
    pub revenue: Decimal,
    /// Share of quotations that moved on to `accepted` or beyond, 0..=1
    pub conversion_rate: f64,
}

fn is_revenue(status: OrderStatus) -> bool {
    matches!(status, OrderStatus::Paid | OrderStatus::Completed)
}

/// Past the negotiation phase and not dropped.
fn is_converted(status: OrderStatus) -> bool {
    status.progress_step().is_some_and(|step| step >= 1)
        && status != OrderStatus::PendingApproval
}

pub fn summarize(orders: &[Order], now: DateTime<Utc>) -> OrderSummary {
    let mut by_status: BTreeMap<String, u64> =
        OrderStatus::iter().map(|s| (s.to_string(), 0)).collect();
    let mut revenue = Decimal::ZERO;
    let mut paying = 0u64;
    let mut needing_attention = 0u64;

    for order in orders {
        *by_status.entry(order.status.to_string()).or_default() += 1;
        if is_revenue(order.status) {
            revenue = revenue.saturating_add(order.total);
            paying += 1;
        }
        if order.status.needs_attention() {
            needing_attention += 1;
        }
    }

    let average_order_value = if paying == 0 {
        Decimal::ZERO
    } else {
        (revenue / Decimal::from(paying)).round_dp(2)
    };

    OrderSummary {
        total_orders: orders.len() as u64,
        by_status,
        revenue,
        average_order_value,
        needing_attention,
        generated_at: now,
    }
}

/// Per-vendor figures, highest revenue first. Orders without a vendor are skipped.
pub fn vendor_performance(orders: &[Order]) -> Vec<VendorPerformance> {
    #[derive(Default)]
    struct Tally {
        orders: u64,
        completed: u64,
        revenue: Decimal,
        converted: u64,
    }

    let mut tallies: HashMap<Uuid, Tally> = HashMap::new();
    for order in orders {
        let Some(vendor_id) = order.vendor_id else {
            continue;
        };
        let tally = tallies.entry(vendor_id).or_default();
        tally.orders += 1;
        if order.status == OrderStatus::Completed {
            tally.completed += 1;
        }
        if is_revenue(order.status) {
            tally.revenue = tally.revenue.saturating_add(order.total);
        }
        if is_converted(order.status) {
            tally.converted += 1;
        }
    }

    let mut rows: Vec<VendorPerformance> = tallies
        .into_iter()
        .map(|(vendor_id, t)| VendorPerformance {
            vendor_id,
            orders: t.orders,
            completed: t.completed,
            revenue: t.revenue,
            conversion_rate: if t.orders == 0 {
                0.0
            } else {
                t.converted as f64 / t.orders as f64
            },
        })
        .collect();
    rows.sort_by(|a, b| {
        b.revenue
            .cmp(&a.revenue)
            .then_with(|| b.orders.cmp(&a.orders))
            .then_with(|| a.vendor_id.cmp(&b.vendor_id))
    });
    rows
}

#[derive(Clone)]
pub struct AnalyticsService {
    orders: Arc<OrderService>,
}

impl AnalyticsService {
    pub fn new(orders: Arc<OrderService>) -> Self {
        Self { orders }
    }

    #[instrument(skip(self))]
    pub async fn order_summary(&self, scope: OrderScope) -> Result<OrderSummary, ServiceError> {
        let orders = self.orders.visible_orders(scope).await?;
        Ok(summarize(&orders, Utc::now()))
    }

    pub async fn vendor_performance(&self) -> Result<Vec<VendorPerformance>, ServiceError> {
        let orders = self.orders.visible_orders(OrderScope::All).await?;
        Ok(vendor_performance(&orders))
    }
}
