// core/src/notifier.rs

//! Outbound live-update events. Publishing is fire-and-forget; delivery is
//! whatever the transport behind [`Notifier`] makes of it.

use crate::model::OrderStatus;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::trace;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventName {
  NewOrder,
  OrderUpdated,
  OrderStatusChanged,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventPayload {
  pub order_id: i64,
  pub new_status: OrderStatus,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub store: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderEvent {
  pub id: Uuid,
  pub event_name: EventName,
  pub payload: EventPayload,
  pub emitted_at: DateTime<Utc>,
}

impl OrderEvent {
  pub fn new(event_name: EventName, order_id: i64, new_status: OrderStatus, store: Option<String>) -> Self {
    Self {
      id: Uuid::new_v4(),
      event_name,
      payload: EventPayload {
        order_id,
        new_status,
        store,
      },
      emitted_at: Utc::now(),
    }
  }
}

pub trait Notifier: Send + Sync {
  /// Never blocks and never fails the caller.
  fn publish(&self, event: OrderEvent);
}

/// In-process fan-out over a tokio broadcast channel. Slow subscribers lag
/// and lose events; with no subscribers events are dropped.
#[derive(Debug, Clone)]
pub struct BroadcastNotifier {
  sender: broadcast::Sender<OrderEvent>,
}

impl BroadcastNotifier {
  pub fn new(capacity: usize) -> Self {
    let (sender, _rx) = broadcast::channel(capacity.max(1));
    Self { sender }
  }

  pub fn subscribe(&self) -> broadcast::Receiver<OrderEvent> {
    self.sender.subscribe()
  }
}

impl Notifier for BroadcastNotifier {
  fn publish(&self, event: OrderEvent) {
    match self.sender.send(event) {
      Ok(receivers) => trace!(receivers, "Order event published."),
      Err(_) => trace!("Order event dropped; no subscribers."),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn subscribers_receive_published_events() {
    let notifier = BroadcastNotifier::new(8);
    let mut rx = notifier.subscribe();
    notifier.publish(OrderEvent::new(
      EventName::OrderStatusChanged,
      42,
      OrderStatus::Ready,
      Some("Pub".into()),
    ));
    let event = rx.recv().await.unwrap();
    assert_eq!(event.payload.order_id, 42);
    assert_eq!(event.event_name, EventName::OrderStatusChanged);
  }

  #[test]
  fn publishing_without_subscribers_is_silent() {
    BroadcastNotifier::new(1).publish(OrderEvent::new(EventName::NewOrder, 1, OrderStatus::Processing, None));
  }

  #[test]
  fn event_serialises_with_snake_case_name() {
    let event = OrderEvent::new(EventName::OrderStatusChanged, 5, OrderStatus::Completed, None);
    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json["event_name"], "order_status_changed");
    assert_eq!(json["payload"]["new_status"], "completed");
    assert!(json["payload"].get("store").is_none());
  }
}
