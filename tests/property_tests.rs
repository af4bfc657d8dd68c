//! Property-based tests for the order lifecycle rules.
//!
//! Transitions are pure, so these run without a database.

use chrono::Utc;
use clubhx_api::models::{Order, OrderAuthor, OrderLine, OrderStatus, PaymentProof, TrackingStatus};
use clubhx_api::notifications::NotificationBoard;
use clubhx_api::notifications::NotificationKind;
use clubhx_api::services::order_status::{get_orders_needing_attention, OrderStatusService};
use proptest::prelude::*;
use rust_decimal::Decimal;
use strum::IntoEnumIterator;

fn status_strategy() -> impl Strategy<Value = OrderStatus> {
    let all: Vec<OrderStatus> = OrderStatus::iter().collect();
    proptest::sample::select(all)
}

fn tracking_strategy() -> impl Strategy<Value = TrackingStatus> {
    prop_oneof![
        Just(TrackingStatus::Pending),
        Just(TrackingStatus::InTransit),
        Just(TrackingStatus::OutForDelivery),
        Just(TrackingStatus::Delivered),
        Just(TrackingStatus::Exception),
    ]
}

fn line_strategy() -> impl Strategy<Value = OrderLine> {
    ("[A-Za-z ]{1,20}", 1u32..50, 0i64..100_000)
        .prop_map(|(name, qty, cents)| OrderLine::new(name, qty, Decimal::new(cents, 2)))
}

fn order_strategy() -> impl Strategy<Value = Order> {
    (
        status_strategy(),
        proptest::collection::vec(line_strategy(), 1..6),
        any::<bool>(),
        any::<bool>(),
    )
        .prop_map(|(status, lines, delivered, paid)| {
            let mut order = Order::new("Salon Aurora", OrderAuthor::Client, lines).with_status(status);
            if delivered {
                order.delivered_date = Some(Utc::now());
            }
            if paid {
                order.paid_date = Some(Utc::now());
            }
            order
        })
}

fn proof() -> PaymentProof {
    PaymentProof {
        file_name: "transfer.pdf".to_string(),
        upload_date: Utc::now(),
        url: "https://files.clubhx.test/transfer.pdf".to_string(),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn completion_iff_delivered_and_paid(order in order_strategy(), target in status_strategy()) {
        let svc = OrderStatusService::default();
        let updated = svc.update_order_status(&order, target);

        let both = updated.delivered_date.is_some() && updated.paid_date.is_some();
        prop_assert_eq!(updated.status == OrderStatus::Completed, both || target == OrderStatus::Completed);
        if both {
            prop_assert!(updated.completed_date.is_some());
        }
    }

    #[test]
    fn transitions_never_touch_the_input(order in order_strategy(), target in status_strategy(), tracking in tracking_strategy()) {
        let svc = OrderStatusService::default();
        let before = order.clone();
        let _ = svc.update_order_status(&order, target);
        let _ = svc.process_tracking_update(&order, tracking);
        let _ = svc.process_payment_verification(&order, true);
        let _ = svc.process_payment_proof_upload(&order, proof());
        prop_assert_eq!(order, before);
    }

    #[test]
    fn tracking_only_moves_shipped_orders(order in order_strategy(), tracking in tracking_strategy()) {
        let svc = OrderStatusService::default();
        let updated = svc.process_tracking_update(&order, tracking);

        if order.status == OrderStatus::Shipped && tracking == TrackingStatus::Delivered {
            prop_assert!(matches!(updated.status, OrderStatus::Delivered | OrderStatus::Completed));
            prop_assert!(updated.delivered_date.is_some());
        } else {
            prop_assert_eq!(updated, order);
        }
    }

    #[test]
    fn verification_requires_payment_pending(order in order_strategy(), verified in any::<bool>()) {
        let svc = OrderStatusService::default();
        let updated = svc.process_payment_verification(&order, verified);

        if verified && order.status == OrderStatus::PaymentPending {
            prop_assert!(matches!(updated.status, OrderStatus::Paid | OrderStatus::Completed));
            prop_assert!(updated.paid_date.is_some());
        } else {
            prop_assert_eq!(updated, order);
        }
    }

    #[test]
    fn proof_upload_always_lands_in_payment_pending(order in order_strategy()) {
        let svc = OrderStatusService::default();
        let updated = svc.process_payment_proof_upload(&order, proof());
        prop_assert_eq!(updated.status, OrderStatus::PaymentPending);
        prop_assert!(updated.payment_proof.is_some());
        prop_assert!(updated.paid_date.is_none());
        prop_assert_eq!(updated.total, order.total);
    }

    #[test]
    fn attention_filter_is_an_ordered_subset(orders in proptest::collection::vec(order_strategy(), 0..12)) {
        let flagged = get_orders_needing_attention(&orders);
        prop_assert!(flagged.iter().all(|o| o.status.needs_attention()));

        let expected: Vec<_> = orders.iter().filter(|o| o.status.needs_attention()).cloned().collect();
        prop_assert_eq!(flagged, expected);
    }

    #[test]
    fn board_keeps_one_badge_per_route(counts in proptest::collection::vec(0usize..5, 1..8)) {
        let mut board = NotificationBoard::new();
        let now = Utc::now();
        for count in &counts {
            board.push("/sales/orders", NotificationKind::OrderRequest, *count, now);
        }

        let last_non_zero = counts.iter().rev().find(|c| **c > 0).copied();
        prop_assert_eq!(board.get("/sales/orders").map(|b| b.count), last_non_zero);
        prop_assert!(board.badges().len() <= 1);
    }
}
