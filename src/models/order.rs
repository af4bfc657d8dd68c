use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};
use utoipa::ToSchema;
use uuid::Uuid;

/// Lifecycle stage of an order.
///
/// `Completed` is never a transition target on its own: it is derived by the
/// status service once an order has been both delivered and paid.
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
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OrderStatus {
    Quotation,
    Requested,
    PendingApproval,
    Accepted,
    Invoiced,
    Shipped,
    Delivered,
    PaymentPending,
    Paid,
    Completed,
    Rejected,
    Canceled,
    Processing,
}

/// Number of steps on the progress track, `Completed` being the last one.
const PROGRESS_STEPS: u8 = 7;

impl OrderStatus {
    /// Statuses someone has to act on.
    pub fn needs_attention(self) -> bool {
        matches!(
            self,
            OrderStatus::PaymentPending | OrderStatus::Requested | OrderStatus::Quotation
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            OrderStatus::Completed | OrderStatus::Rejected | OrderStatus::Canceled
        )
    }

    /// Line items and notes may only change before the order is accepted.
    pub fn is_editable(self) -> bool {
        matches!(
            self,
            OrderStatus::Quotation | OrderStatus::Requested | OrderStatus::PendingApproval
        )
    }

    /// Position on the progress track. Rejected and canceled orders are off the track.
    pub fn progress_step(self) -> Option<u8> {
        match self {
            OrderStatus::Quotation | OrderStatus::Requested => Some(0),
            OrderStatus::PendingApproval | OrderStatus::Accepted => Some(1),
            OrderStatus::Processing | OrderStatus::Invoiced => Some(2),
            OrderStatus::Shipped => Some(3),
            OrderStatus::Delivered => Some(4),
            OrderStatus::PaymentPending => Some(5),
            OrderStatus::Paid => Some(6),
            OrderStatus::Completed => Some(PROGRESS_STEPS),
            OrderStatus::Rejected | OrderStatus::Canceled => None,
        }
    }

    pub fn progress_percent(self) -> Option<u8> {
        self.progress_step()
            .map(|step| ((u16::from(step) * 100) / u16::from(PROGRESS_STEPS)) as u8)
    }

    pub fn metadata(self) -> StatusMetadata {
        let (label, color, description) = match self {
            OrderStatus::Quotation => (
                "Quotation",
                "blue",
                "Prepared by a sales vendor, waiting for the client",
            ),
            OrderStatus::Requested => (
                "Requested",
                "amber",
                "Submitted by the client, waiting for review",
            ),
            OrderStatus::PendingApproval => (
                "Pending approval",
                "orange",
                "Revised by sales, waiting for the client to approve",
            ),
            OrderStatus::Accepted => ("Accepted", "teal", "Confirmed by both parties"),
            OrderStatus::Invoiced => ("Invoiced", "indigo", "Invoice issued"),
            OrderStatus::Shipped => ("Shipped", "purple", "Handed over to the carrier"),
            OrderStatus::Delivered => ("Delivered", "green", "Received by the client"),
            OrderStatus::PaymentPending => (
                "Payment pending",
                "yellow",
                "Payment proof uploaded, waiting for verification",
            ),
            OrderStatus::Paid => ("Paid", "emerald", "Payment verified"),
            OrderStatus::Completed => ("Completed", "gray", "Delivered and paid"),
            OrderStatus::Rejected => ("Rejected", "red", "Declined by one of the parties"),
            OrderStatus::Canceled => ("Canceled", "slate", "Withdrawn before completion"),
            OrderStatus::Processing => ("Processing", "cyan", "Being prepared for shipment"),
        };

        StatusMetadata {
            status: self,
            label: label.to_string(),
            color: color.to_string(),
            description: description.to_string(),
            progress_percent: self.progress_percent(),
        }
    }

    pub fn all_metadata() -> Vec<StatusMetadata> {
        OrderStatus::iter().map(OrderStatus::metadata).collect()
    }
}

/// Presentation data for a status. Never consulted by transition logic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct StatusMetadata {
    pub status: OrderStatus,
    pub label: String,
    pub color: String,
    pub description: String,
    pub progress_percent: Option<u8>,
}

/// Which side of the relationship authored or revised an order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum OrderAuthor {
    Sales,
    Client,
}

impl OrderAuthor {
    pub fn initial_status(self) -> OrderStatus {
        match self {
            OrderAuthor::Sales => OrderStatus::Quotation,
            OrderAuthor::Client => OrderStatus::Requested,
        }
    }
}

/// Carrier-reported state of a shipment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, ToSchema)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TrackingStatus {
    Pending,
    InTransit,
    OutForDelivery,
    Delivered,
    Exception,
}

/// Highest unit price accepted on an order line or a product.
pub const MAX_UNIT_PRICE: Decimal = dec!(1000000000);

/// Digits kept after the decimal point for every amount.
pub const MONEY_SCALE: u32 = 2;

/// Brings an amount to the fixed money scale. Backends that drop trailing
/// zeros hand amounts back with a shorter scale.
pub fn money(value: Decimal) -> Decimal {
    let mut amount = value.round_dp(MONEY_SCALE);
    amount.rescale(MONEY_SCALE);
    amount
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct OrderLine {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<Uuid>,
    pub name: String,
    pub quantity: u32,
    pub price: Decimal,
}

impl OrderLine {
    pub fn new(name: impl Into<String>, quantity: u32, price: Decimal) -> Self {
        Self {
            product_id: None,
            name: name.into(),
            quantity,
            price,
        }
    }

    /// `None` when the product does not fit in a `Decimal`.
    pub fn line_total(&self) -> Option<Decimal> {
        self.price.checked_mul(Decimal::from(self.quantity))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TrackingInfo {
    pub company: String,
    pub tracking_number: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PaymentProof {
    pub file_name: String,
    pub upload_date: DateTime<Utc>,
    pub url: String,
}

/// An order as it travels through the portal.
///
/// Values are never mutated by the lifecycle functions: every transition
/// returns a new `Order`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub id: Uuid,
    pub date: DateTime<Utc>,
    pub total: Decimal,
    pub items: Vec<OrderLine>,
    pub customer: String,
    pub customer_id: Option<Uuid>,
    pub vendor_id: Option<Uuid>,
    pub created_by: OrderAuthor,
    pub modified_by: Option<OrderAuthor>,
    pub original_order_id: Option<Uuid>,
    pub sales_notes: Option<String>,
    pub modified_date: Option<DateTime<Utc>>,
    pub invoice_url: Option<String>,
    pub tracking_info: Option<TrackingInfo>,
    pub payment_proof: Option<PaymentProof>,
    pub delivered_date: Option<DateTime<Utc>>,
    pub paid_date: Option<DateTime<Utc>>,
    pub completed_date: Option<DateTime<Utc>>,
    pub status: OrderStatus,
}

impl Order {
    /// A fresh order in the initial status of its author.
    ///
    /// The total saturates at `Decimal::MAX`; callers taking amounts from
    /// outside check them with [`Order::checked_total`] first.
    pub fn new(customer: impl Into<String>, created_by: OrderAuthor, items: Vec<OrderLine>) -> Self {
        let total = Self::total_of(&items);
        Self {
            id: Uuid::new_v4(),
            date: Utc::now(),
            total,
            items,
            customer: customer.into(),
            customer_id: None,
            vendor_id: None,
            created_by,
            modified_by: None,
            original_order_id: None,
            sales_notes: None,
            modified_date: None,
            invoice_url: None,
            tracking_info: None,
            payment_proof: None,
            delivered_date: None,
            paid_date: None,
            completed_date: None,
            status: created_by.initial_status(),
        }
    }

    pub fn checked_total(items: &[OrderLine]) -> Option<Decimal> {
        items
            .iter()
            .try_fold(Decimal::ZERO, |sum, line| sum.checked_add(line.line_total()?))
    }

    pub fn total_of(items: &[OrderLine]) -> Decimal {
        Self::checked_total(items).unwrap_or(Decimal::MAX)
    }

    pub fn with_status(mut self, status: OrderStatus) -> Self {
        self.status = status;
        self
    }
}

/// Which orders a caller is allowed to see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderScope {
    All,
    Vendor(Uuid),
    Customer(Uuid),
}

impl OrderScope {
    pub fn permits(&self, order: &Order) -> bool {
        match self {
            OrderScope::All => true,
            OrderScope::Vendor(id) => order.vendor_id == Some(*id),
            OrderScope::Customer(id) => order.customer_id == Some(*id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::str::FromStr;

    #[test]
    fn status_wire_names_are_snake_case() {
        assert_eq!(OrderStatus::PaymentPending.to_string(), "payment_pending");
        assert_eq!(
            OrderStatus::from_str("pending_approval").unwrap(),
            OrderStatus::PendingApproval
        );
        assert_eq!(
            serde_json::to_value(OrderStatus::Canceled).unwrap(),
            serde_json::json!("canceled")
        );
        assert_eq!(OrderStatus::iter().count(), 13);
    }

    #[test]
    fn attention_statuses() {
        let flagged: Vec<_> = OrderStatus::iter().filter(|s| s.needs_attention()).collect();
        assert_eq!(
            flagged,
            vec![
                OrderStatus::Quotation,
                OrderStatus::Requested,
                OrderStatus::PaymentPending
            ]
        );
    }

    #[test]
    fn progress_track_is_monotonic_towards_completion() {
        assert_eq!(OrderStatus::Quotation.progress_percent(), Some(0));
        assert_eq!(OrderStatus::Shipped.progress_percent(), Some(42));
        assert_eq!(OrderStatus::Completed.progress_percent(), Some(100));
        assert_eq!(OrderStatus::Canceled.progress_step(), None);
        assert!(OrderStatus::Delivered.progress_step() < OrderStatus::Paid.progress_step());
    }

    #[test]
    fn new_order_uses_author_initial_status_and_totals_lines() {
        let order = Order::new(
            "Salon Aurora",
            OrderAuthor::Client,
            vec![
                OrderLine::new("Color cream 60ml", 4, dec!(12.50)),
                OrderLine::new("Developer 1L", 2, dec!(8.25)),
            ],
        );
        assert_eq!(order.status, OrderStatus::Requested);
        assert_eq!(order.total, dec!(66.50));

        let quote = Order::new("Salon Aurora", OrderAuthor::Sales, vec![]);
        assert_eq!(quote.status, OrderStatus::Quotation);
        assert_eq!(quote.total, Decimal::ZERO);
    }

    #[test]
    fn oversized_lines_have_no_total() {
        let line = OrderLine::new("Bulk", 2, Decimal::MAX);
        assert_eq!(line.line_total(), None);
        assert_eq!(Order::checked_total(&[line.clone()]), None);

        let order = Order::new("Salon Aurora", OrderAuthor::Client, vec![line]);
        assert_eq!(order.total, Decimal::MAX);
    }

    #[test]
    fn money_keeps_two_decimals() {
        assert_eq!(money(dec!(3000000000)).to_string(), "3000000000.00");
        assert_eq!(money(dec!(12.5)).to_string(), "12.50");
        assert_eq!(money(dec!(8.255)).to_string(), "8.26");
    }

    #[test]
    fn scope_limits_visibility() {
        let client = Uuid::new_v4();
        let vendor = Uuid::new_v4();
        let mut order = Order::new("Salon", OrderAuthor::Client, vec![]);
        order.customer_id = Some(client);

        assert!(OrderScope::All.permits(&order));
        assert!(OrderScope::Customer(client).permits(&order));
        assert!(!OrderScope::Customer(Uuid::new_v4()).permits(&order));
        assert!(!OrderScope::Vendor(vendor).permits(&order));
    }
}
