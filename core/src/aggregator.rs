// core/src/aggregator.rs

//! Status-filtered aggregation: pages through the source, normalises, filters
//! by store and sorts by `order_id`.

use crate::error::RelayResult;
use crate::model::{NormalizedOrder, OrderStatus, StatusView};
use crate::normalizer::Normalizer;
use crate::source::{OrderSource, PageQuery, SortOrder, MAX_PAGE_SIZE};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Hard stop for sources that never report exhaustion.
const MAX_PAGES: u32 = 500;

/// The result of one aggregation. `complete` is `false` when a page after the
/// first failed and the orders gathered so far were kept.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Listing {
  pub orders: Vec<NormalizedOrder>,
  pub complete: bool,
}

impl Listing {
  /// Subset attributed to `store` (trimmed, case-insensitive), order preserved.
  pub fn for_store(&self, store: &str) -> Listing {
    Listing {
      orders: self.orders.iter().filter(|o| o.belongs_to(store)).cloned().collect(),
      complete: self.complete,
    }
  }

  pub fn len(&self) -> usize {
    self.orders.len()
  }

  pub fn is_empty(&self) -> bool {
    self.orders.is_empty()
  }
}

#[derive(Clone)]
pub struct Aggregator {
  source: Arc<dyn OrderSource>,
  normalizer: Arc<Normalizer>,
}

impl Aggregator {
  pub fn new(source: Arc<dyn OrderSource>, normalizer: Arc<Normalizer>) -> Self {
    Self { source, normalizer }
  }

  pub fn normalizer(&self) -> &Arc<Normalizer> {
    &self.normalizer
  }

  /// Every order in `view`, optionally restricted to one store.
  ///
  /// A failing first page fails the call. A failing later page ends the scan
  /// and the partial listing comes back with `complete == false`.
  #[instrument(
    name = "aggregator::list_orders",
    skip(self),
    fields(source = self.source.name(), view = %view),
    err(Display)
  )]
  pub async fn list_orders(
    &self,
    view: StatusView,
    store: Option<&str>,
    sort: SortOrder,
  ) -> RelayResult<Listing> {
    let store = store.map(str::trim).filter(|s| !s.is_empty());
    let mut raw = Vec::new();
    let mut complete = true;
    let mut page_no = 1u32;

    loop {
      let mut query = PageQuery::new(view.statuses(), page_no);
      query.store = store.map(str::to_string);
      query.per_page = MAX_PAGE_SIZE;
      query.sort = sort;

      match self.source.fetch_page(&query).await {
        Ok(page) => {
          let empty = page.orders.is_empty();
          raw.extend(page.orders);
          if empty || !page.has_more {
            break;
          }
        }
        Err(e) if page_no == 1 => return Err(e),
        Err(e) => {
          warn!(page = page_no, error = %e, gathered = raw.len(), "Order source failed mid-listing; returning a partial listing.");
          complete = false;
          break;
        }
      }

      if page_no >= MAX_PAGES {
        warn!(pages = page_no, "Stopped paging: page limit reached.");
        complete = false;
        break;
      }
      page_no += 1;
    }

    let mut orders: Vec<NormalizedOrder> = self
      .normalizer
      .normalize_all(&raw)
      .into_iter()
      .filter(|o| view.contains(o.status()))
      .filter(|o| store.map_or(true, |s| o.belongs_to(s)))
      .collect();
    sort_by_id(&mut orders, sort);

    debug!(pages = page_no, raw = raw.len(), kept = orders.len(), complete, "Listing aggregated.");
    Ok(Listing { orders, complete })
  }

  /// The newest `limit` orders across all statuses, from a single page.
  #[instrument(name = "aggregator::latest_orders", skip(self), err(Display))]
  pub async fn latest_orders(&self, limit: u32) -> RelayResult<Vec<NormalizedOrder>> {
    let limit = limit.clamp(1, MAX_PAGE_SIZE);
    let mut query = PageQuery::new(OrderStatus::ALL.to_vec(), 1);
    query.per_page = limit;
    query.sort = SortOrder::Desc;

    let page = self.source.fetch_page(&query).await?;
    let mut orders = self.normalizer.normalize_all(&page.orders);
    sort_by_id(&mut orders, SortOrder::Desc);
    orders.truncate(limit as usize);
    Ok(orders)
  }
}

fn sort_by_id(orders: &mut [NormalizedOrder], sort: SortOrder) {
  match sort {
    SortOrder::Asc => orders.sort_by_key(|o| o.order_id()),
    SortOrder::Desc => orders.sort_by_key(|o| std::cmp::Reverse(o.order_id())),
  }
}
