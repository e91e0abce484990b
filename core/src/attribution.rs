// core/src/attribution.rs

//! Store attribution: which outlet an order belongs to.

use crate::error::{RelayError, RelayResult};
use crate::model::RawOrder;

/// Store name used when nothing attributes an order.
pub const UNKNOWN_SHOP: &str = "Unknown Shop";

/// Ordered `(product-code prefix, store name)` pairs. Order is significant:
/// when a code matches several prefixes, the earliest entry wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreAttributionTable {
  entries: Vec<(String, String)>,
}

impl StoreAttributionTable {
  pub fn new(entries: Vec<(String, String)>) -> Self {
    Self { entries }
  }

  /// The outlets served by the order desk when no table is configured.
  pub fn builtin() -> Self {
    Self::new(
      [
        ("snack-", "Snack"),
        ("restaurantealvo-", "Restaurante Alvo"),
        ("brasserie-", "Brasserie"),
        ("pub-", "Pub"),
        ("eventossociais-", "Eventos Sociais"),
        ("pizzaria-", "Pizzaria"),
        ("lionfoodmarket-", "Lion Food Market"),
        ("eventoesportivo-", "Evento Esportivo"),
      ]
      .into_iter()
      .map(|(prefix, name)| (prefix.to_string(), name.to_string()))
      .collect(),
    )
  }

  /// Parses `prefix=Name,prefix=Name,...`, keeping the written order.
  pub fn parse(spec: &str) -> RelayResult<Self> {
    let mut entries = Vec::new();
    for pair in spec.split(',').map(str::trim).filter(|p| !p.is_empty()) {
      let (prefix, name) = pair
        .split_once('=')
        .ok_or_else(|| RelayError::Validation(format!("Store prefix entry '{}' is not 'prefix=Name'", pair)))?;
      let (prefix, name) = (prefix.trim(), name.trim());
      if prefix.is_empty() || name.is_empty() {
        return Err(RelayError::Validation(format!(
          "Store prefix entry '{}' has an empty prefix or name",
          pair
        )));
      }
      entries.push((prefix.to_string(), name.to_string()));
    }
    if entries.is_empty() {
      return Err(RelayError::Validation("Store prefix table is empty".to_string()));
    }
    Ok(Self::new(entries))
  }

  pub fn entries(&self) -> &[(String, String)] {
    &self.entries
  }

  /// Distinct store names in table order.
  pub fn store_names(&self) -> Vec<&str> {
    let mut names: Vec<&str> = Vec::new();
    for (_, name) in &self.entries {
      if !names.contains(&name.as_str()) {
        names.push(name);
      }
    }
    names
  }

  /// The store for a single product code, first matching prefix wins.
  pub fn match_code(&self, code: &str) -> Option<&str> {
    self
      .entries
      .iter()
      .find(|(prefix, _)| code.starts_with(prefix.as_str()))
      .map(|(_, name)| name.as_str())
  }

  /// Resolves the store of a raw order. Total and deterministic: an explicit
  /// store field wins, then the first line item whose code matches a prefix,
  /// then [`UNKNOWN_SHOP`].
  pub fn resolve(&self, raw: &RawOrder) -> String {
    if let Some(explicit) = raw.explicit_store() {
      return explicit.to_string();
    }
    raw
      .line_items
      .iter()
      .find_map(|item| self.match_code(&item.sku))
      .unwrap_or(UNKNOWN_SHOP)
      .to_string()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::RawLineItem;

  fn order_with_codes(codes: &[&str]) -> RawOrder {
    RawOrder {
      id: 1,
      line_items: codes
        .iter()
        .map(|c| RawLineItem {
          sku: c.to_string(),
          ..RawLineItem::default()
        })
        .collect(),
      ..RawOrder::default()
    }
  }

  #[test]
  fn first_matching_item_decides_the_store() {
    let table = StoreAttributionTable::builtin();
    let order = order_with_codes(&["no-prefix-1", "pub-beer", "snack-chips"]);
    assert_eq!(table.resolve(&order), "Pub");
  }

  #[test]
  fn unmatched_order_is_unknown_shop() {
    let table = StoreAttributionTable::builtin();
    assert_eq!(table.resolve(&order_with_codes(&["xyz", ""])), UNKNOWN_SHOP);
    assert_eq!(table.resolve(&order_with_codes(&[])), UNKNOWN_SHOP);
  }

  #[test]
  fn explicit_store_wins_unless_blank() {
    let table = StoreAttributionTable::builtin();
    let mut order = order_with_codes(&["pub-beer"]);
    order.store = Some("Brasserie".to_string());
    assert_eq!(table.resolve(&order), "Brasserie");
    order.store = Some("   ".to_string());
    assert_eq!(table.resolve(&order), "Pub");
  }

  #[test]
  fn table_order_breaks_ties_between_overlapping_prefixes() {
    let order = order_with_codes(&["pub-snack-01"]);
    let pub_first = StoreAttributionTable::parse("pub-=Pub,pub-snack-=Pub Snacks").unwrap();
    let snack_first = StoreAttributionTable::parse("pub-snack-=Pub Snacks,pub-=Pub").unwrap();
    assert_eq!(pub_first.resolve(&order), "Pub");
    assert_eq!(snack_first.resolve(&order), "Pub Snacks");
    // Same table, same order: same answer every time.
    assert_eq!(pub_first.resolve(&order), pub_first.resolve(&order));
  }

  #[test]
  fn parse_rejects_malformed_entries() {
    assert!(StoreAttributionTable::parse("").is_err());
    assert!(StoreAttributionTable::parse("pub-").is_err());
    assert!(StoreAttributionTable::parse("=Pub").is_err());
    let table = StoreAttributionTable::parse(" snack- = Snack , pub-=Pub,pub2-=Pub ").unwrap();
    assert_eq!(table.entries()[0], ("snack-".to_string(), "Snack".to_string()));
    assert_eq!(table.store_names(), vec!["Snack", "Pub"]);
  }
}
