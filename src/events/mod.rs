use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::OrderStatus;

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends and logs a warning on failure; domain writes never fail because
    /// the event consumer is gone.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!(error = %e, "dropping domain event");
        }
    }
}

/// Domain events emitted after a successful write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    OrderCreated(Uuid),
    OrderRevised(Uuid),
    OrderStatusChanged {
        order_id: Uuid,
        old_status: OrderStatus,
        new_status: OrderStatus,
    },
    OrderCompleted(Uuid),
    PaymentProofUploaded(Uuid),
    ProductCreated(Uuid),
    ProductUpdated(Uuid),
    ProductModuleCreated(Uuid),
    UserCreated(Uuid),
}

/// Drains the channel until every sender is dropped.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) -> usize {
    info!("Starting event processing loop");
    let mut processed = 0;

    while let Some(event) = rx.recv().await {
        processed += 1;
        match &event {
            Event::OrderStatusChanged {
                order_id,
                old_status,
                new_status,
            } => {
                info!(%order_id, %old_status, %new_status, "order status changed");
            }
            Event::OrderCompleted(order_id) => {
                info!(%order_id, "order completed");
            }
            other => {
                info!(event = ?other, "domain event");
            }
        }
    }

    info!(processed, "Event processing loop stopped");
    processed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn loop_drains_until_senders_drop() {
        let (tx, rx) = mpsc::channel(8);
        let sender = EventSender::new(tx);
        let worker = tokio::spawn(process_events(rx));

        let order_id = Uuid::new_v4();
        sender.send(Event::OrderCreated(order_id)).await.unwrap();
        sender
            .send(Event::OrderStatusChanged {
                order_id,
                old_status: OrderStatus::Requested,
                new_status: OrderStatus::Accepted,
            })
            .await
            .unwrap();
        drop(sender);

        assert_eq!(worker.await.unwrap(), 2);
    }

    #[tokio::test]
    async fn send_fails_once_consumer_is_gone() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sender = EventSender::new(tx);
        assert!(sender.send(Event::UserCreated(Uuid::new_v4())).await.is_err());
        sender.send_or_log(Event::UserCreated(Uuid::new_v4())).await;
    }
}
