// src/lib.rs

//! Orderdesk: order aggregation and status relay for a restaurant order desk.
//!
//! The crate sits between a WooCommerce-style order source and the order
//! desk front end. It:
//!  - Fetches raw orders through an interchangeable [`OrderSource`] (REST API
//!    or SQL store), paging until the source runs dry.
//!  - Normalises them into [`NormalizedOrder`], attributing each order to a
//!    store by explicit field or product-code prefix.
//!  - Filters and sorts listings per status view and store, and derives
//!    per-store reports over completed orders.
//!  - Memoises results in a TTL cache keyed by every result-shaping parameter.
//!  - Relays status transitions (and refunds) back to the source, invalidating
//!    the affected cache entries and notifying live clients.
//!
//! Status transitions and webhook ingress run as small named-step pipelines
//! ([`pipeline::Pipeline`]).

pub mod aggregator;
pub mod attribution;
pub mod cache;
pub mod commands;
pub mod error;
pub mod model;
pub mod normalizer;
pub mod notifier;
pub mod payment;
pub mod pipeline;
pub mod reporting;
pub mod service;
pub mod source;
pub mod warmer;
pub mod webhook;

// --- Re-exports for the Public API ---

pub use crate::aggregator::{Aggregator, Listing};
pub use crate::attribution::{StoreAttributionTable, UNKNOWN_SHOP};
pub use crate::cache::{CacheKey, Route, StatusChange, TtlCache};
pub use crate::commands::{CommandRelay, RelayDeps, Transition, TransitionOutcome};
pub use crate::error::{RelayError, RelayResult};
pub use crate::model::{LineItem, NormalizedOrder, OrderStatus, RawBilling, RawLineItem, RawOrder, StatusView};
pub use crate::normalizer::{Normalizer, NormalizerConfig};
pub use crate::notifier::{BroadcastNotifier, EventName, Notifier, OrderEvent};
pub use crate::payment::{PaymentConfig, PaymentProcessor, RefundReceipt, StripeRefunds};
pub use crate::reporting::{CustomerSpend, ProductSales, TotalSales};
pub use crate::service::{CacheTtls, CachedResult, OrderQueries, ResultCache};
pub use crate::source::rest::{RestSourceConfig, WooRestClient};
pub use crate::source::sql::SqlOrderSource;
pub use crate::source::{OrderSource, OrderWriter, Page, PageQuery, SortOrder};
pub use crate::warmer::{CacheWarmer, WarmReport, WarmTrigger, WarmerConfig};
pub use crate::webhook::{WebhookDeps, WebhookIngest, WebhookOutcome};
