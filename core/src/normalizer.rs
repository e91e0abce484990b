// core/src/normalizer.rs

//! Maps raw source records onto [`NormalizedOrder`].

use crate::attribution::StoreAttributionTable;
use crate::error::{RelayError, RelayResult};
use crate::model::{LineItem, NormalizedOrder, OrderStatus, RawLineItem, RawOrder};
use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::Arc;
use tracing::warn;

/// Source timestamp layout, always UTC.
pub const SOURCE_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

const UNKNOWN_PAYMENT_METHOD: &str = "Unknown Payment Method";
const UNKNOWN_PRODUCT: &str = "Unknown Product";

#[derive(Debug, Clone)]
pub struct NormalizerConfig {
  /// Flat charge added to every order's subtotal.
  pub service_charge: Decimal,
}

impl Default for NormalizerConfig {
  fn default() -> Self {
    Self {
      service_charge: Decimal::ONE,
    }
  }
}

#[derive(Debug, Clone)]
pub struct Normalizer {
  table: Arc<StoreAttributionTable>,
  config: NormalizerConfig,
}

impl Normalizer {
  pub fn new(table: Arc<StoreAttributionTable>, config: NormalizerConfig) -> Self {
    Self { table, config }
  }

  pub fn attribution(&self) -> &StoreAttributionTable {
    &self.table
  }

  /// Builds the canonical order. Fails with `MalformedTimestamp` or
  /// `MalformedRecord`; callers skip such records.
  pub fn normalize(&self, raw: &RawOrder) -> RelayResult<NormalizedOrder> {
    let status = OrderStatus::from_source(&raw.status).ok_or_else(|| RelayError::MalformedRecord {
      order_id: Some(raw.id),
      reason: format!("status '{}' is outside the order vocabulary", raw.status),
    })?;
    let created_at = parse_source_timestamp(raw.id, raw.created_at.as_deref())?;

    let line_items = raw
      .line_items
      .iter()
      .map(|item| normalize_line_item(raw.id, item))
      .collect::<RelayResult<Vec<_>>>()?;
    let subtotal = line_items
      .iter()
      .try_fold(Decimal::ZERO, |acc, item| {
        item
          .unit_price
          .checked_mul(Decimal::from(item.quantity))
          .and_then(|line| acc.checked_add(line))
      })
      .ok_or_else(|| RelayError::MalformedRecord {
        order_id: Some(raw.id),
        reason: "line totals overflow the subtotal".to_string(),
      })?
      .round_dp(2);

    let customer_name = format!("{} {}", raw.billing.first_name.trim(), raw.billing.last_name.trim())
      .trim()
      .to_string();
    let payment_method = raw
      .payment_method
      .as_deref()
      .map(str::trim)
      .filter(|m| !m.is_empty())
      .unwrap_or(UNKNOWN_PAYMENT_METHOD)
      .to_string();

    NormalizedOrder::new(
      raw.id,
      customer_name,
      created_at,
      status,
      self.table.resolve(raw),
      line_items,
      subtotal,
      self.config.service_charge,
      payment_method,
    )
  }

  /// Normalises a batch, dropping records that fail with a record-level
  /// error (logged). Input order is kept.
  pub fn normalize_all(&self, raws: &[RawOrder]) -> Vec<NormalizedOrder> {
    raws
      .iter()
      .filter_map(|raw| match self.normalize(raw) {
        Ok(order) => Some(order),
        Err(e) => {
          warn!(order_id = raw.id, error = %e, "Skipping order that failed normalisation.");
          None
        }
      })
      .collect()
  }
}

/// Parses `YYYY-MM-DDTHH:MM:SS` as a UTC instant.
pub fn parse_source_timestamp(order_id: i64, value: Option<&str>) -> RelayResult<DateTime<Utc>> {
  let text = value.unwrap_or_default();
  NaiveDateTime::parse_from_str(text.trim(), SOURCE_TIMESTAMP_FORMAT)
    .map(|naive| naive.and_utc())
    .map_err(|_| RelayError::MalformedTimestamp {
      order_id,
      value: text.to_string(),
    })
}

// A missing or non-positive quantity prices the line as a single unit.
fn normalize_line_item(order_id: i64, item: &RawLineItem) -> RelayResult<LineItem> {
  let quantity = item
    .quantity
    .filter(|q| *q >= 1)
    .and_then(|q| u32::try_from(q).ok())
    .unwrap_or(1);
  let line_total = match item.line_total.as_deref().map(str::trim) {
    None | Some("") => Decimal::ZERO,
    Some(text) => Decimal::from_str(text).map_err(|e| RelayError::MalformedRecord {
      order_id: Some(order_id),
      reason: format!("line total '{}' is not a decimal: {}", text, e),
    })?,
  };

  Ok(LineItem {
    name: item
      .name
      .as_deref()
      .map(str::trim)
      .filter(|n| !n.is_empty())
      .unwrap_or(UNKNOWN_PRODUCT)
      .to_string(),
    quantity,
    unit_price: line_total / Decimal::from(quantity),
  })
}
