// core/src/model/status.rs

//! The fixed fulfilment-status vocabulary and the views built on it.

use crate::error::RelayError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
  Processing,
  Preparing,
  Ready,
  Completed,
  Refunded,
}

impl OrderStatus {
  pub const ALL: [OrderStatus; 5] = [
    OrderStatus::Processing,
    OrderStatus::Preparing,
    OrderStatus::Ready,
    OrderStatus::Completed,
    OrderStatus::Refunded,
  ];

  /// Statuses that make up the "open" view.
  pub const OPEN: [OrderStatus; 3] = [OrderStatus::Processing, OrderStatus::Preparing, OrderStatus::Ready];

  pub fn as_str(&self) -> &'static str {
    match self {
      OrderStatus::Processing => "processing",
      OrderStatus::Preparing => "preparing",
      OrderStatus::Ready => "ready",
      OrderStatus::Completed => "completed",
      OrderStatus::Refunded => "refunded",
    }
  }

  /// Parses a status as the order source spells it. The `wc-` prefix used by
  /// the SQL store is accepted. Anything outside the vocabulary is `None`.
  pub fn from_source(raw: &str) -> Option<Self> {
    let trimmed = raw.trim();
    let bare = trimmed.strip_prefix("wc-").unwrap_or(trimmed);
    OrderStatus::ALL
      .into_iter()
      .find(|s| s.as_str().eq_ignore_ascii_case(bare))
  }

  /// Position along `processing -> preparing -> ready -> completed`.
  /// `refunded` sits outside the fulfilment chain.
  pub(crate) fn fulfilment_rank(&self) -> Option<u8> {
    match self {
      OrderStatus::Processing => Some(0),
      OrderStatus::Preparing => Some(1),
      OrderStatus::Ready => Some(2),
      OrderStatus::Completed => Some(3),
      OrderStatus::Refunded => None,
    }
  }

  pub fn is_open(&self) -> bool {
    OrderStatus::OPEN.contains(self)
  }
}

impl fmt::Display for OrderStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for OrderStatus {
  type Err = RelayError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    OrderStatus::from_source(s).ok_or_else(|| RelayError::Validation(format!("Unknown order status '{}'", s)))
  }
}

/// A logical status filter for listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusView {
  One(OrderStatus),
  /// `processing ∪ preparing ∪ ready`
  Open,
  /// Every status in the vocabulary.
  All,
}

impl StatusView {
  pub fn statuses(&self) -> Vec<OrderStatus> {
    match self {
      StatusView::One(s) => vec![*s],
      StatusView::Open => OrderStatus::OPEN.to_vec(),
      StatusView::All => OrderStatus::ALL.to_vec(),
    }
  }

  pub fn contains(&self, status: OrderStatus) -> bool {
    match self {
      StatusView::One(s) => *s == status,
      StatusView::Open => status.is_open(),
      StatusView::All => true,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      StatusView::One(s) => s.as_str(),
      StatusView::Open => "open",
      StatusView::All => "all",
    }
  }
}

impl fmt::Display for StatusView {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for StatusView {
  type Err = RelayError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "open" => Ok(StatusView::Open),
      "all" | "any" => Ok(StatusView::All),
      other => other.parse::<OrderStatus>().map(StatusView::One),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn source_spellings_are_recognised() {
    assert_eq!(OrderStatus::from_source("processing"), Some(OrderStatus::Processing));
    assert_eq!(OrderStatus::from_source("wc-completed"), Some(OrderStatus::Completed));
    assert_eq!(OrderStatus::from_source(" Ready "), Some(OrderStatus::Ready));
    assert_eq!(OrderStatus::from_source("on-hold"), None);
    assert_eq!(OrderStatus::from_source(""), None);
  }

  #[test]
  fn unknown_status_is_a_validation_error() {
    let err = "shipped".parse::<OrderStatus>().unwrap_err();
    assert!(matches!(err, RelayError::Validation(_)));
  }

  #[test]
  fn open_view_is_the_union_of_the_three_active_statuses() {
    let open: StatusView = "open".parse().unwrap();
    assert_eq!(
      open.statuses(),
      vec![OrderStatus::Processing, OrderStatus::Preparing, OrderStatus::Ready]
    );
    assert!(open.contains(OrderStatus::Ready));
    assert!(!open.contains(OrderStatus::Completed));
    assert_eq!("ALL".parse::<StatusView>().unwrap(), StatusView::All);
    assert_eq!(
      "refunded".parse::<StatusView>().unwrap(),
      StatusView::One(OrderStatus::Refunded)
    );
  }
}
