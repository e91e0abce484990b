// core/src/source/mod.rs

//! Order source adapters.
//!
//! Two interchangeable read variants sit behind [`OrderSource`]: the
//! upstream REST API ([`rest::WooRestClient`]) and a direct SQL store
//! ([`sql::SqlOrderSource`]). Status writes go through [`OrderWriter`], which
//! only the REST API implements.

pub mod rest;
pub mod sql;

use crate::error::{RelayError, RelayResult};
use crate::model::{OrderStatus, RawOrder};
use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Largest page any source is asked for.
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
  Asc,
  #[default]
  Desc,
}

impl SortOrder {
  pub fn as_str(&self) -> &'static str {
    match self {
      SortOrder::Asc => "asc",
      SortOrder::Desc => "desc",
    }
  }
}

impl fmt::Display for SortOrder {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for SortOrder {
  type Err = RelayError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "asc" => Ok(SortOrder::Asc),
      "desc" => Ok(SortOrder::Desc),
      other => Err(RelayError::Validation(format!(
        "Unknown sort direction '{}', expected 'asc' or 'desc'",
        other
      ))),
    }
  }
}

/// One page request against a source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageQuery {
  /// Never empty; "all statuses" is spelled out explicitly.
  pub statuses: Vec<OrderStatus>,
  /// Optional narrowing hint. Sources may use it to drop orders whose
  /// explicit store differs; the aggregator re-filters after attribution.
  pub store: Option<String>,
  /// 1-based.
  pub page: u32,
  pub per_page: u32,
  pub sort: SortOrder,
}

impl PageQuery {
  pub fn new(statuses: Vec<OrderStatus>, page: u32) -> Self {
    Self {
      statuses,
      store: None,
      page,
      per_page: MAX_PAGE_SIZE,
      sort: SortOrder::Desc,
    }
  }

  /// `per_page` clamped to `1..=MAX_PAGE_SIZE`.
  pub fn effective_per_page(&self) -> u32 {
    self.per_page.clamp(1, MAX_PAGE_SIZE)
  }
}

/// One page of raw orders.
#[derive(Debug, Clone, Default)]
pub struct Page {
  pub orders: Vec<RawOrder>,
  /// `false` once the source signals exhaustion.
  pub has_more: bool,
}

#[async_trait]
pub trait OrderSource: Send + Sync {
  /// Short label used in logs.
  fn name(&self) -> &'static str;

  async fn fetch_page(&self, query: &PageQuery) -> RelayResult<Page>;

  /// A single order by id. `OrderNotFound` when the source has no such order.
  async fn fetch_order(&self, order_id: i64) -> RelayResult<RawOrder>;
}

#[async_trait]
pub trait OrderWriter: Send + Sync {
  /// Writes the new status. One call, no retry; a refusal comes back as
  /// `UpstreamRejected` with the source's status code and body.
  async fn update_status(&self, order_id: i64, status: OrderStatus) -> RelayResult<()>;
}
