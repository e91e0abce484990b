// core/src/reporting.rs

//! Per-store analytics over completed orders.
//!
//! Callers hand in orders already narrowed to one store and `completed`;
//! nothing here filters.

use crate::error::{RelayError, RelayResult};
use crate::model::NormalizedOrder;
use rust_decimal::Decimal;
use serde::Serialize;

pub const DEFAULT_TOP_N: usize = 5;
/// Largest `n` a top-N report accepts.
pub const MAX_TOP_N: usize = 100;

fn sum_overflow(order: &NormalizedOrder) -> RelayError {
  RelayError::MalformedRecord {
    order_id: Some(order.order_id()),
    reason: "report sum overflows".to_string(),
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomerSpend {
  pub name: String,
  #[serde(with = "rust_decimal::serde::float")]
  pub total_spent: Decimal,
}

/// `price` is the unit price seen on the last processed occurrence of the
/// product, not an average.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductSales {
  pub name: String,
  pub quantity_sold: u64,
  #[serde(with = "rust_decimal::serde::float")]
  pub price: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TotalSales {
  pub store: String,
  #[serde(with = "rust_decimal::serde::float")]
  pub total_sales: Decimal,
  pub order_count: usize,
}

/// Customers by summed `total`, highest first. Equal sums keep the order in
/// which the customers first appeared.
pub fn top_customers(orders: &[NormalizedOrder], n: usize) -> RelayResult<Vec<CustomerSpend>> {
  let mut spends: Vec<CustomerSpend> = Vec::new();
  for order in orders {
    match spends.iter_mut().find(|c| c.name == order.customer_name()) {
      Some(entry) => {
        entry.total_spent = entry
          .total_spent
          .checked_add(order.total())
          .ok_or_else(|| sum_overflow(order))?;
      }
      None => spends.push(CustomerSpend {
        name: order.customer_name().to_string(),
        total_spent: order.total(),
      }),
    }
  }
  // sort_by is stable
  spends.sort_by(|a, b| b.total_spent.cmp(&a.total_spent));
  spends.truncate(n);
  Ok(spends)
}

/// Products by summed quantity across every line item, highest first.
pub fn top_products(orders: &[NormalizedOrder], n: usize) -> Vec<ProductSales> {
  let mut products: Vec<ProductSales> = Vec::new();
  for item in orders.iter().flat_map(|o| o.line_items()) {
    match products.iter_mut().find(|p| p.name == item.name) {
      Some(entry) => {
        entry.quantity_sold = entry.quantity_sold.saturating_add(u64::from(item.quantity));
        entry.price = item.unit_price;
      }
      None => products.push(ProductSales {
        name: item.name.clone(),
        quantity_sold: u64::from(item.quantity),
        price: item.unit_price,
      }),
    }
  }
  products.sort_by(|a, b| b.quantity_sold.cmp(&a.quantity_sold));
  products.truncate(n);
  products
}

/// Σ `subtotal`; the service charge is excluded.
pub fn total_sales(orders: &[NormalizedOrder]) -> RelayResult<Decimal> {
  orders.iter().try_fold(Decimal::ZERO, |acc, order| {
    acc.checked_add(order.subtotal()).ok_or_else(|| sum_overflow(order))
  })
}
