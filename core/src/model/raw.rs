// core/src/model/raw.rs

//! Source-neutral raw order records, as produced by an order source adapter
//! before normalisation.

/// One order exactly as the source reported it. Nothing here is validated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawOrder {
  pub id: i64,
  /// Creation instant as text, expected as `YYYY-MM-DDTHH:MM:SS` in UTC.
  pub created_at: Option<String>,
  pub status: String,
  pub billing: RawBilling,
  /// Payment method display label.
  pub payment_method: Option<String>,
  /// Payment-processor charge id, needed to refund the order.
  pub charge_reference: Option<String>,
  /// Explicit store name stored with the order, when the source keeps one.
  pub store: Option<String>,
  pub line_items: Vec<RawLineItem>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawBilling {
  pub first_name: String,
  pub last_name: String,
  pub email: String,
  pub phone: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawLineItem {
  /// Product code (SKU) used for store attribution.
  pub sku: String,
  pub name: Option<String>,
  pub quantity: Option<i64>,
  /// Line total as decimal text, e.g. `"10.00"`.
  pub line_total: Option<String>,
}

impl RawOrder {
  /// The explicit store field, if present and not blank.
  pub fn explicit_store(&self) -> Option<&str> {
    self.store.as_deref().map(str::trim).filter(|s| !s.is_empty())
  }
}
