// core/src/cache.rs

//! Short-lived memoisation of listings and reports.
//!
//! Keys are derived from the route plus every parameter that changes the
//! result. Entries die by TTL or by explicit invalidation after a status
//! change; size is not bounded.

use crate::model::{OrderStatus, StatusView};
use crate::source::SortOrder;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
  Orders,
  LatestOrders,
  TopCustomers,
  TopProducts,
  TotalSales,
}

impl Route {
  pub fn as_str(&self) -> &'static str {
    match self {
      Route::Orders => "orders",
      Route::LatestOrders => "latest-orders",
      Route::TopCustomers => "top-customers",
      Route::TopProducts => "top-products",
      Route::TotalSales => "total-sales",
    }
  }
}

/// Trimmed, lower-cased store name as used in keys.
pub fn normalize_store_key(store: &str) -> String {
  store.trim().to_lowercase()
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
  route: Route,
  status: Option<StatusView>,
  store: Option<String>,
  sort: Option<SortOrder>,
  limit: Option<u32>,
}

impl CacheKey {
  pub fn orders(view: StatusView, store: Option<&str>, sort: SortOrder) -> Self {
    Self {
      route: Route::Orders,
      status: Some(view),
      store: store.map(normalize_store_key).filter(|s| !s.is_empty()),
      sort: Some(sort),
      limit: None,
    }
  }

  pub fn latest(limit: u32) -> Self {
    Self {
      route: Route::LatestOrders,
      status: None,
      store: None,
      sort: None,
      limit: Some(limit),
    }
  }

  /// Report routes always cover `completed` orders of one store.
  pub fn report(route: Route, store: &str, limit: Option<u32>) -> Self {
    Self {
      route,
      status: Some(StatusView::One(OrderStatus::Completed)),
      store: Some(normalize_store_key(store)),
      sort: None,
      limit,
    }
  }

  pub fn route(&self) -> Route {
    self.route
  }

  pub fn store(&self) -> Option<&str> {
    self.store.as_deref()
  }

  /// Whether this entry's content may differ after `change`.
  pub fn is_affected_by(&self, change: &StatusChange) -> bool {
    if self.route == Route::LatestOrders {
      return true;
    }
    let store_hit = match (&self.store, change.store.as_deref()) {
      (None, _) | (_, None) => true,
      (Some(key_store), Some(changed)) => *key_store == normalize_store_key(changed),
    };
    if !store_hit {
      return false;
    }
    let view = match self.status {
      Some(view) => view,
      None => return true,
    };
    let touches = |status: OrderStatus| view.contains(status);
    touches(change.to) || change.from.map_or(true, touches)
  }
}

impl fmt::Display for CacheKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.route.as_str())?;
    let mut sep = '?';
    if let Some(status) = self.status {
      write!(f, "{}status={}", sep, status)?;
      sep = '&';
    }
    if let Some(store) = &self.store {
      write!(f, "{}store={}", sep, store)?;
      sep = '&';
    }
    if let Some(sort) = self.sort {
      write!(f, "{}sort={}", sep, sort)?;
      sep = '&';
    }
    if let Some(limit) = self.limit {
      write!(f, "{}limit={}", sep, limit)?;
    }
    Ok(())
  }
}

/// A status write that just succeeded. `from == None` means the previous
/// status is unknown, which matches every status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
  pub order_id: i64,
  pub from: Option<OrderStatus>,
  pub to: OrderStatus,
  pub store: Option<String>,
}

#[derive(Debug, Clone)]
struct Entry<V> {
  value: V,
  expires_at: Instant,
}

/// Concurrency-safe TTL map. Locks are held only for the map operation.
#[derive(Debug)]
pub struct TtlCache<V> {
  entries: RwLock<HashMap<CacheKey, Entry<V>>>,
}

impl<V> Default for TtlCache<V> {
  fn default() -> Self {
    Self {
      entries: RwLock::new(HashMap::new()),
    }
  }
}

impl<V: Clone> TtlCache<V> {
  pub fn new() -> Self {
    Self::default()
  }

  /// A clone of the live value under `key`, or `None` once expired.
  pub fn get(&self, key: &CacheKey) -> Option<V> {
    let now = Instant::now();
    {
      let entries = self.entries.read();
      match entries.get(key) {
        Some(entry) if entry.expires_at > now => return Some(entry.value.clone()),
        Some(_) => {}
        None => return None,
      }
    }
    let mut entries = self.entries.write();
    if entries.get(key).is_some_and(|e| e.expires_at <= now) {
      entries.remove(key);
      trace!(%key, "Dropped expired cache entry.");
    }
    None
  }

  pub fn insert(&self, key: CacheKey, value: V, ttl: Duration) {
    let expires_at = Instant::now() + ttl;
    self.entries.write().insert(key, Entry { value, expires_at });
  }

  pub fn invalidate(&self, key: &CacheKey) -> bool {
    self.entries.write().remove(key).is_some()
  }

  /// Removes every entry whose content may change with `change`; returns how
  /// many went.
  pub fn invalidate_affected(&self, change: &StatusChange) -> usize {
    let mut entries = self.entries.write();
    let before = entries.len();
    entries.retain(|key, _| !key.is_affected_by(change));
    before - entries.len()
  }

  pub fn purge_expired(&self) -> usize {
    let now = Instant::now();
    let mut entries = self.entries.write();
    let before = entries.len();
    entries.retain(|_, e| e.expires_at > now);
    before - entries.len()
  }

  pub fn len(&self) -> usize {
    self.entries.read().len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.read().is_empty()
  }

  pub fn clear(&self) {
    self.entries.write().clear();
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn change(from: Option<OrderStatus>, to: OrderStatus, store: Option<&str>) -> StatusChange {
    StatusChange {
      order_id: 7,
      from,
      to,
      store: store.map(str::to_string),
    }
  }

  #[test]
  fn keys_differ_by_every_parameter() {
    let base = CacheKey::orders(StatusView::Open, Some("Pub"), SortOrder::Desc);
    assert_ne!(base, CacheKey::orders(StatusView::Open, Some("Snack"), SortOrder::Desc));
    assert_ne!(base, CacheKey::orders(StatusView::Open, None, SortOrder::Desc));
    assert_ne!(base, CacheKey::orders(StatusView::Open, Some("Pub"), SortOrder::Asc));
    assert_ne!(
      base,
      CacheKey::orders(StatusView::One(OrderStatus::Ready), Some("Pub"), SortOrder::Desc)
    );
    assert_ne!(
      CacheKey::report(Route::TopCustomers, "Pub", Some(5)),
      CacheKey::report(Route::TopProducts, "Pub", Some(5))
    );
    assert_ne!(CacheKey::latest(10), CacheKey::latest(50));
  }

  #[test]
  fn store_names_are_normalised_in_keys() {
    assert_eq!(
      CacheKey::orders(StatusView::All, Some("  Lion Food Market "), SortOrder::Desc),
      CacheKey::orders(StatusView::All, Some("lion food market"), SortOrder::Desc)
    );
    assert_eq!(
      CacheKey::orders(StatusView::All, Some("  "), SortOrder::Desc),
      CacheKey::orders(StatusView::All, None, SortOrder::Desc)
    );
  }

  #[test]
  fn display_lists_parameters() {
    let key = CacheKey::orders(StatusView::Open, Some("Pub"), SortOrder::Asc);
    assert_eq!(key.to_string(), "orders?status=open&store=pub&sort=asc");
    assert_eq!(CacheKey::latest(20).to_string(), "latest-orders?limit=20");
  }

  #[test]
  fn completion_touches_open_completed_and_reports_of_that_store() {
    let c = change(Some(OrderStatus::Ready), OrderStatus::Completed, Some("Pub"));
    assert!(CacheKey::orders(StatusView::Open, Some("pub"), SortOrder::Desc).is_affected_by(&c));
    assert!(CacheKey::orders(StatusView::One(OrderStatus::Completed), None, SortOrder::Desc).is_affected_by(&c));
    assert!(CacheKey::report(Route::TotalSales, "Pub", None).is_affected_by(&c));
    assert!(CacheKey::latest(50).is_affected_by(&c));

    assert!(!CacheKey::orders(StatusView::Open, Some("Snack"), SortOrder::Desc).is_affected_by(&c));
    assert!(!CacheKey::report(Route::TotalSales, "Snack", None).is_affected_by(&c));
    assert!(!CacheKey::orders(StatusView::One(OrderStatus::Refunded), None, SortOrder::Desc).is_affected_by(&c));
  }

  #[test]
  fn open_moves_leave_reports_alone() {
    let c = change(Some(OrderStatus::Processing), OrderStatus::Preparing, Some("Pub"));
    assert!(!CacheKey::report(Route::TopProducts, "Pub", Some(5)).is_affected_by(&c));
    assert!(CacheKey::orders(StatusView::Open, Some("Pub"), SortOrder::Asc).is_affected_by(&c));
  }

  #[test]
  fn unknown_previous_status_or_store_invalidates_broadly() {
    let c = change(None, OrderStatus::Processing, None);
    assert!(CacheKey::report(Route::TopCustomers, "Snack", Some(5)).is_affected_by(&c));
    assert!(CacheKey::orders(StatusView::One(OrderStatus::Refunded), Some("Pub"), SortOrder::Desc).is_affected_by(&c));
  }

  #[tokio::test(start_paused = true)]
  async fn entries_expire_after_ttl() {
    let cache: TtlCache<String> = TtlCache::new();
    let key = CacheKey::latest(50);
    cache.insert(key.clone(), "fresh".to_string(), Duration::from_secs(50));

    tokio::time::advance(Duration::from_secs(49)).await;
    assert_eq!(cache.get(&key).as_deref(), Some("fresh"));

    tokio::time::advance(Duration::from_secs(2)).await;
    assert_eq!(cache.get(&key), None);
    assert!(cache.is_empty());
  }

  #[tokio::test(start_paused = true)]
  async fn invalidate_affected_keeps_unrelated_entries() {
    let cache: TtlCache<u32> = TtlCache::new();
    let ttl = Duration::from_secs(300);
    cache.insert(CacheKey::orders(StatusView::Open, Some("Pub"), SortOrder::Desc), 1, ttl);
    cache.insert(CacheKey::orders(StatusView::Open, Some("Snack"), SortOrder::Desc), 2, ttl);
    cache.insert(CacheKey::report(Route::TotalSales, "Pub", None), 3, ttl);

    let removed = cache.invalidate_affected(&change(
      Some(OrderStatus::Processing),
      OrderStatus::Ready,
      Some("Pub"),
    ));
    assert_eq!(removed, 1);
    assert_eq!(cache.len(), 2);
    assert_eq!(
      cache.get(&CacheKey::orders(StatusView::Open, Some("Snack"), SortOrder::Desc)),
      Some(2)
    );
  }
}
