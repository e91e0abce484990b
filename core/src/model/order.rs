// core/src/model/order.rs

//! The canonical, simplified order served to clients.

use super::status::OrderStatus;
use crate::error::{RelayError, RelayResult};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

/// A line item after normalisation. `quantity` is always at least 1.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineItem {
  pub name: String,
  pub quantity: u32,
  #[serde(with = "rust_decimal::serde::float")]
  pub unit_price: Decimal,
}

/// An order in canonical shape. Built only by the normaliser; immutable
/// afterwards, so `total == subtotal + service_charge` always holds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedOrder {
  order_id: i64,
  customer_name: String,
  created_at: DateTime<Utc>,
  status: OrderStatus,
  store: String,
  line_items: Vec<LineItem>,
  #[serde(with = "rust_decimal::serde::float")]
  subtotal: Decimal,
  #[serde(with = "rust_decimal::serde::float")]
  service_charge: Decimal,
  #[serde(with = "rust_decimal::serde::float")]
  total: Decimal,
  payment_method: String,
}

impl NormalizedOrder {
  #[allow(clippy::too_many_arguments)]
  pub(crate) fn new(
    order_id: i64,
    customer_name: String,
    created_at: DateTime<Utc>,
    status: OrderStatus,
    store: String,
    line_items: Vec<LineItem>,
    subtotal: Decimal,
    service_charge: Decimal,
    payment_method: String,
  ) -> RelayResult<Self> {
    let total = subtotal
      .checked_add(service_charge)
      .ok_or_else(|| RelayError::MalformedRecord {
        order_id: Some(order_id),
        reason: format!("total overflows: {} + {}", subtotal, service_charge),
      })?;
    Ok(Self {
      order_id,
      customer_name,
      created_at,
      status,
      store,
      line_items,
      subtotal,
      service_charge,
      total,
      payment_method,
    })
  }

  pub fn order_id(&self) -> i64 {
    self.order_id
  }

  pub fn customer_name(&self) -> &str {
    &self.customer_name
  }

  pub fn created_at(&self) -> DateTime<Utc> {
    self.created_at
  }

  pub fn status(&self) -> OrderStatus {
    self.status
  }

  pub fn store(&self) -> &str {
    &self.store
  }

  pub fn line_items(&self) -> &[LineItem] {
    &self.line_items
  }

  pub fn subtotal(&self) -> Decimal {
    self.subtotal
  }

  pub fn service_charge(&self) -> Decimal {
    self.service_charge
  }

  pub fn total(&self) -> Decimal {
    self.total
  }

  pub fn payment_method(&self) -> &str {
    &self.payment_method
  }

  /// Case-insensitive match on the attributed store.
  pub fn belongs_to(&self, store: &str) -> bool {
    self.store.to_lowercase() == store.trim().to_lowercase()
  }
}
