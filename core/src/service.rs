// core/src/service.rs

//! Read path: cache check, aggregation, reporting, cache store.

use crate::aggregator::{Aggregator, Listing};
use crate::cache::{CacheKey, Route, StatusChange, TtlCache};
use crate::error::{RelayError, RelayResult};
use crate::model::{NormalizedOrder, OrderStatus, StatusView};
use crate::reporting::{self, CustomerSpend, ProductSales, TotalSales};
use crate::source::SortOrder;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Every shape the read path caches.
#[derive(Debug, Clone)]
pub enum CachedResult {
  Listing(Listing),
  Latest(Vec<NormalizedOrder>),
  Customers(Vec<CustomerSpend>),
  Products(Vec<ProductSales>),
  Sales(TotalSales),
}

#[derive(Debug, Clone, Copy)]
pub struct CacheTtls {
  /// Listings without a store.
  pub listing: Duration,
  /// Listings for one store.
  pub store_listing: Duration,
  pub latest: Duration,
  pub report: Duration,
}

impl Default for CacheTtls {
  fn default() -> Self {
    Self {
      listing: Duration::from_secs(50),
      store_listing: Duration::from_secs(300),
      latest: Duration::from_secs(50),
      report: Duration::from_secs(300),
    }
  }
}

pub type ResultCache = TtlCache<CachedResult>;

#[derive(Clone)]
pub struct OrderQueries {
  aggregator: Aggregator,
  cache: Arc<ResultCache>,
  ttls: CacheTtls,
}

/// Top-N size as it appears in the cache key; out-of-range `n` is refused
/// rather than truncated.
fn report_limit(n: usize) -> RelayResult<u32> {
  if !(1..=reporting::MAX_TOP_N).contains(&n) {
    return Err(RelayError::Validation(format!(
      "limit must be between 1 and {}, got {}",
      reporting::MAX_TOP_N,
      n
    )));
  }
  u32::try_from(n).map_err(|e| RelayError::Validation(format!("limit {} is out of range: {}", n, e)))
}

impl OrderQueries {
  pub fn new(aggregator: Aggregator, cache: Arc<ResultCache>, ttls: CacheTtls) -> Self {
    Self {
      aggregator,
      cache,
      ttls,
    }
  }

  pub fn cache(&self) -> &Arc<ResultCache> {
    &self.cache
  }

  fn listing_ttl(&self, store: Option<&str>) -> Duration {
    if store.is_some() {
      self.ttls.store_listing
    } else {
      self.ttls.listing
    }
  }

  /// Cached listing. Partial listings are returned but never cached.
  #[instrument(name = "queries::orders", skip(self), err(Display))]
  pub async fn orders(
    &self,
    view: StatusView,
    store: Option<&str>,
    sort: SortOrder,
  ) -> RelayResult<Listing> {
    let store = store.map(str::trim).filter(|s| !s.is_empty());
    let key = CacheKey::orders(view, store, sort);
    if let Some(CachedResult::Listing(listing)) = self.cache.get(&key) {
      debug!(%key, "Cache hit.");
      return Ok(listing);
    }

    let listing = self.aggregator.list_orders(view, store, sort).await?;
    if listing.complete {
      self.cache.insert(key, CachedResult::Listing(listing.clone()), self.listing_ttl(store));
    }
    Ok(listing)
  }

  #[instrument(name = "queries::latest", skip(self), err(Display))]
  pub async fn latest(&self, limit: u32) -> RelayResult<Vec<NormalizedOrder>> {
    let key = CacheKey::latest(limit);
    if let Some(CachedResult::Latest(orders)) = self.cache.get(&key) {
      return Ok(orders);
    }
    let orders = self.aggregator.latest_orders(limit).await?;
    self.cache.insert(key, CachedResult::Latest(orders.clone()), self.ttls.latest);
    Ok(orders)
  }

  /// Completed orders of one store; reports refuse partial data.
  async fn completed_for_store(&self, store: &str) -> RelayResult<Vec<NormalizedOrder>> {
    let store = store.trim();
    if store.is_empty() {
      return Err(RelayError::Validation("Store name must not be empty".to_string()));
    }
    let listing = self
      .orders(StatusView::One(OrderStatus::Completed), Some(store), SortOrder::Desc)
      .await?;
    if !listing.complete {
      return Err(RelayError::unavailable(
        None,
        "Order source failed part-way through the listing; the report would be incomplete",
      ));
    }
    Ok(listing.orders)
  }

  #[instrument(name = "queries::top_customers", skip(self), err(Display))]
  pub async fn top_customers(&self, store: &str, n: usize) -> RelayResult<Vec<CustomerSpend>> {
    let key = CacheKey::report(Route::TopCustomers, store, Some(report_limit(n)?));
    if let Some(CachedResult::Customers(top)) = self.cache.get(&key) {
      return Ok(top);
    }
    let orders = self.completed_for_store(store).await?;
    let top = reporting::top_customers(&orders, n)?;
    self.cache.insert(key, CachedResult::Customers(top.clone()), self.ttls.report);
    Ok(top)
  }

  #[instrument(name = "queries::top_products", skip(self), err(Display))]
  pub async fn top_products(&self, store: &str, n: usize) -> RelayResult<Vec<ProductSales>> {
    let key = CacheKey::report(Route::TopProducts, store, Some(report_limit(n)?));
    if let Some(CachedResult::Products(top)) = self.cache.get(&key) {
      return Ok(top);
    }
    let orders = self.completed_for_store(store).await?;
    let top = reporting::top_products(&orders, n);
    self.cache.insert(key, CachedResult::Products(top.clone()), self.ttls.report);
    Ok(top)
  }

  #[instrument(name = "queries::total_sales", skip(self), err(Display))]
  pub async fn total_sales(&self, store: &str) -> RelayResult<TotalSales> {
    let key = CacheKey::report(Route::TotalSales, store, None);
    if let Some(CachedResult::Sales(sales)) = self.cache.get(&key) {
      return Ok(sales);
    }
    let orders = self.completed_for_store(store).await?;
    let sales = TotalSales {
      store: store.trim().to_string(),
      total_sales: reporting::total_sales(&orders)?,
      order_count: orders.len(),
    };
    self.cache.insert(key, CachedResult::Sales(sales.clone()), self.ttls.report);
    Ok(sales)
  }

  /// Drops every entry `change` may have made stale.
  pub fn invalidate(&self, change: &StatusChange) -> usize {
    let removed = self.cache.invalidate_affected(change);
    debug!(order_id = change.order_id, removed, "Cache entries invalidated.");
    removed
  }

  /// Fetches `view` once and caches the unfiltered listing plus one
  /// partition per store. Returns how many entries were written.
  #[instrument(name = "queries::prime", skip(self, stores), err(Display))]
  pub async fn prime(&self, view: StatusView, stores: &[String]) -> RelayResult<usize> {
    let listing = self.aggregator.list_orders(view, None, SortOrder::Desc).await?;
    if !listing.complete {
      warn!(%view, "Skipping cache warm for a partial listing.");
      return Err(RelayError::unavailable(None, format!("Partial listing for '{}'", view)));
    }

    let mut written = 0;
    for store in stores {
      let partition = listing.for_store(store);
      self.cache.insert(
        CacheKey::orders(view, Some(store), SortOrder::Desc),
        CachedResult::Listing(partition),
        self.ttls.store_listing,
      );
      written += 1;
    }
    self.cache.insert(
      CacheKey::orders(view, None, SortOrder::Desc),
      CachedResult::Listing(listing),
      self.ttls.listing,
    );
    written += 1;
    info!(%view, written, "Cache primed.");
    Ok(written)
  }
}
