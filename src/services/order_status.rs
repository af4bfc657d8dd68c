use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::models::{Order, OrderStatus, PaymentProof, TrackingStatus};

/// Decides whether an order has reached the end of its lifecycle.
///
/// Must return true exactly when the order has been both delivered and paid.
pub trait CompletionPolicy: Send + Sync {
    fn should_auto_complete(&self, order: &Order) -> bool;
}

impl<F> CompletionPolicy for F
where
    F: Fn(&Order) -> bool + Send + Sync,
{
    fn should_auto_complete(&self, order: &Order) -> bool {
        self(order)
    }
}

/// Completes an order once both milestone stamps are present.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeliveredAndPaid;

impl CompletionPolicy for DeliveredAndPaid {
    fn should_auto_complete(&self, order: &Order) -> bool {
        order.delivered_date.is_some() && order.paid_date.is_some()
    }
}

/// Pure order lifecycle transitions.
///
/// Every operation takes an order by reference and hands back a new value;
/// nothing here performs I/O.
#[derive(Clone)]
pub struct OrderStatusService {
    policy: Arc<dyn CompletionPolicy>,
}

impl fmt::Debug for OrderStatusService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrderStatusService").finish_non_exhaustive()
    }
}

impl Default for OrderStatusService {
    fn default() -> Self {
        Self::new(DeliveredAndPaid)
    }
}

impl OrderStatusService {
    pub fn new(policy: impl CompletionPolicy + 'static) -> Self {
        Self {
            policy: Arc::new(policy),
        }
    }

    pub fn update_order_status(&self, order: &Order, new_status: OrderStatus) -> Order {
        self.update_order_status_at(order, new_status, Utc::now())
    }

    /// Sets `new_status`, stamps the delivery/payment milestone it represents,
    /// then promotes the order to `Completed` if the policy says so.
    pub fn update_order_status_at(
        &self,
        order: &Order,
        new_status: OrderStatus,
        now: DateTime<Utc>,
    ) -> Order {
        let mut updated = order.clone();
        updated.status = new_status;

        match new_status {
            OrderStatus::Delivered => {
                updated.delivered_date.get_or_insert(now);
            }
            OrderStatus::Paid => {
                updated.paid_date.get_or_insert(now);
            }
            _ => {}
        }

        if self.policy.should_auto_complete(&updated) {
            updated.status = OrderStatus::Completed;
            updated.completed_date = Some(now);
        }

        updated
    }

    /// Delivery can only be recorded from `Shipped`.
    pub fn process_tracking_update(&self, order: &Order, tracking: TrackingStatus) -> Order {
        if tracking == TrackingStatus::Delivered && order.status == OrderStatus::Shipped {
            self.update_order_status(order, OrderStatus::Delivered)
        } else {
            order.clone()
        }
    }

    /// Attaching a proof always resets the order to `PaymentPending`, whatever
    /// its current status. A new proof has not been verified yet, so any
    /// earlier payment stamp is dropped.
    pub fn process_payment_proof_upload(&self, order: &Order, proof: PaymentProof) -> Order {
        let mut updated = order.clone();
        updated.status = OrderStatus::PaymentPending;
        updated.payment_proof = Some(proof);
        updated.paid_date = None;
        updated
    }

    pub fn process_payment_verification(&self, order: &Order, verified: bool) -> Order {
        if verified && order.status == OrderStatus::PaymentPending {
            self.update_order_status(order, OrderStatus::Paid)
        } else {
            order.clone()
        }
    }
}

/// Orders someone has to act on, in input order.
pub fn get_orders_needing_attention(orders: &[Order]) -> Vec<Order> {
    orders
        .iter()
        .filter(|order| order.status.needs_attention())
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{OrderAuthor, OrderLine};
    use rust_decimal_macros::dec;

    fn order(status: OrderStatus) -> Order {
        Order::new(
            "Salon Aurora",
            OrderAuthor::Client,
            vec![OrderLine::new("Bond repair mask", 3, dec!(20.00))],
        )
        .with_status(status)
    }

    fn proof(name: &str) -> PaymentProof {
        PaymentProof {
            file_name: name.to_string(),
            upload_date: Utc::now(),
            url: format!("https://files.clubhx.test/{name}"),
        }
    }

    #[test]
    fn shipped_order_becomes_delivered_on_tracking_update() {
        let service = OrderStatusService::default();
        let updated =
            service.process_tracking_update(&order(OrderStatus::Shipped), TrackingStatus::Delivered);

        assert_eq!(updated.status, OrderStatus::Delivered);
        assert!(updated.delivered_date.is_some());
        assert!(updated.completed_date.is_none());
    }

    #[test]
    fn tracking_update_ignored_outside_shipped() {
        let service = OrderStatusService::default();
        let accepted = order(OrderStatus::Accepted);
        assert_eq!(
            service.process_tracking_update(&accepted, TrackingStatus::Delivered),
            accepted
        );

        let shipped = order(OrderStatus::Shipped);
        assert_eq!(
            service.process_tracking_update(&shipped, TrackingStatus::InTransit),
            shipped
        );
    }

    #[test]
    fn verification_moves_payment_pending_to_paid() {
        let service = OrderStatusService::default();
        let updated = service.process_payment_verification(&order(OrderStatus::PaymentPending), true);
        assert_eq!(updated.status, OrderStatus::Paid);
        assert!(updated.paid_date.is_some());

        let rejected = order(OrderStatus::PaymentPending);
        assert_eq!(service.process_payment_verification(&rejected, false), rejected);

        let invoiced = order(OrderStatus::Invoiced);
        assert_eq!(service.process_payment_verification(&invoiced, true), invoiced);
    }

    #[test]
    fn delivered_then_paid_auto_completes() {
        let service = OrderStatusService::default();
        let delivered =
            service.process_tracking_update(&order(OrderStatus::Shipped), TrackingStatus::Delivered);
        let pending = service.process_payment_proof_upload(&delivered, proof("transfer.pdf"));
        let done = service.process_payment_verification(&pending, true);

        assert_eq!(done.status, OrderStatus::Completed);
        assert!(done.completed_date.is_some());
        assert!(done.delivered_date.is_some());
        assert!(done.paid_date.is_some());
    }

    #[test]
    fn prepaid_order_completes_on_delivery() {
        let service = OrderStatusService::default();
        let paid = service.update_order_status(&order(OrderStatus::PaymentPending), OrderStatus::Paid);
        assert_eq!(paid.status, OrderStatus::Paid);

        let shipped = service.update_order_status(&paid, OrderStatus::Shipped);
        let done = service.process_tracking_update(&shipped, TrackingStatus::Delivered);
        assert_eq!(done.status, OrderStatus::Completed);
    }

    #[test]
    fn injected_policy_drives_completion() {
        let service = OrderStatusService::new(|o: &Order| o.status == OrderStatus::Delivered);
        let updated = service.update_order_status(&order(OrderStatus::Shipped), OrderStatus::Delivered);
        assert_eq!(updated.status, OrderStatus::Completed);

        let never = OrderStatusService::new(|_: &Order| false);
        let updated = never.update_order_status(&order(OrderStatus::Shipped), OrderStatus::Delivered);
        assert_eq!(updated.status, OrderStatus::Delivered);
        assert!(updated.completed_date.is_none());
    }

    #[test]
    fn milestone_stamp_is_kept_on_repeat() {
        let service = OrderStatusService::default();
        let first = Utc::now() - chrono::Duration::days(2);
        let delivered =
            service.update_order_status_at(&order(OrderStatus::Shipped), OrderStatus::Delivered, first);
        let again = service.update_order_status(&delivered, OrderStatus::Delivered);
        assert_eq!(again.delivered_date, Some(first));
    }

    #[test]
    fn payment_proof_upload_overwrites_advanced_status() {
        let service = OrderStatusService::default();
        let paid = order(OrderStatus::Paid);
        let updated = service.process_payment_proof_upload(&paid, proof("second.pdf"));
        assert_eq!(updated.status, OrderStatus::PaymentPending);
        assert_eq!(
            updated.payment_proof.as_ref().map(|p| p.file_name.as_str()),
            Some("second.pdf")
        );
    }

    #[test]
    fn reuploaded_proof_needs_verification_before_completion() {
        let service = OrderStatusService::default();
        let paid = service.update_order_status(&order(OrderStatus::PaymentPending), OrderStatus::Paid);
        assert!(paid.paid_date.is_some());

        let reuploaded = service.process_payment_proof_upload(&paid, proof("second.pdf"));
        assert_eq!(reuploaded.status, OrderStatus::PaymentPending);
        assert!(reuploaded.paid_date.is_none());

        let shipped = service.update_order_status(&reuploaded, OrderStatus::Shipped);
        let delivered = service.process_tracking_update(&shipped, TrackingStatus::Delivered);
        assert_eq!(delivered.status, OrderStatus::Delivered);
        assert!(delivered.completed_date.is_none());

        let pending = service.process_payment_proof_upload(&delivered, proof("second.pdf"));
        let done = service.process_payment_verification(&pending, true);
        assert_eq!(done.status, OrderStatus::Completed);
    }

    #[test]
    fn payment_proof_upload_is_idempotent() {
        let service = OrderStatusService::default();
        let p = proof("receipt.png");
        let once = service.process_payment_proof_upload(&order(OrderStatus::Invoiced), p.clone());
        let twice = service.process_payment_proof_upload(&once, p);
        assert_eq!(once, twice);
    }

    #[test]
    fn attention_filter_preserves_input_order() {
        let orders = vec![
            order(OrderStatus::Paid),
            order(OrderStatus::Requested),
            order(OrderStatus::Quotation),
        ];
        let flagged = get_orders_needing_attention(&orders);
        assert_eq!(flagged, vec![orders[1].clone(), orders[2].clone()]);
    }
}
