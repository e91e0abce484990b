// tests/common/mod.rs
#![allow(dead_code)] // Not every test binary uses every helper

use async_trait::async_trait;
use once_cell::sync::Lazy;
use orderdesk::{
  Aggregator, CacheTtls, CommandRelay, Normalizer, NormalizerConfig, Notifier, OrderEvent, OrderQueries,
  OrderSource, OrderStatus, OrderWriter, Page, PageQuery, PaymentProcessor, RawBilling, RawLineItem, RawOrder,
  RefundReceipt, RelayDeps, RelayError, RelayResult, ResultCache, SortOrder, StoreAttributionTable,
};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::Level;

// --- Raw order builders ---

pub fn item(sku: &str, name: &str, qty: i64, total: &str) -> RawLineItem {
  RawLineItem {
    sku: sku.to_string(),
    name: Some(name.to_string()),
    quantity: Some(qty),
    line_total: Some(total.to_string()),
  }
}

pub fn raw_order(id: i64, status: &str, customer: &str, items: Vec<RawLineItem>) -> RawOrder {
  let (first, last) = customer.split_once(' ').unwrap_or((customer, ""));
  RawOrder {
    id,
    created_at: Some("2024-06-01T12:00:00".to_string()),
    status: status.to_string(),
    billing: RawBilling {
      first_name: first.to_string(),
      last_name: last.to_string(),
      email: format!("{}@example.com", first.to_lowercase()),
      phone: String::new(),
    },
    payment_method: Some("Card".to_string()),
    charge_reference: None,
    store: None,
    line_items: items,
  }
}

/// `count` orders with ids `1..=count`, alternating Pub and Snack items.
pub fn many_orders(count: i64, status: &str) -> Vec<RawOrder> {
  (1..=count)
    .map(|id| {
      let sku = if id % 2 == 0 { "pub-beer" } else { "snack-toast" };
      raw_order(id, status, "Ana Lopes", vec![item(sku, "Item", 1, "2.00")])
    })
    .collect()
}

// --- In-memory order source ---

#[derive(Default)]
pub struct FakeSource {
  orders: Mutex<Vec<RawOrder>>,
  failing_pages: Mutex<HashSet<u32>>,
  delay: Mutex<Option<Duration>>,
  pub page_calls: AtomicUsize,
  pub seen_queries: Mutex<Vec<PageQuery>>,
}

impl FakeSource {
  pub fn with_orders(orders: Vec<RawOrder>) -> Arc<Self> {
    let source = Self::default();
    *source.orders.lock() = orders;
    Arc::new(source)
  }

  pub fn fail_page(&self, page: u32) {
    self.failing_pages.lock().insert(page);
  }

  pub fn heal(&self) {
    self.failing_pages.lock().clear();
  }

  pub fn set_delay(&self, delay: Duration) {
    *self.delay.lock() = Some(delay);
  }

  pub fn set_status(&self, order_id: i64, status: OrderStatus) {
    if let Some(o) = self.orders.lock().iter_mut().find(|o| o.id == order_id) {
      o.status = status.as_str().to_string();
    }
  }

  pub fn status_of(&self, order_id: i64) -> Option<String> {
    self.orders.lock().iter().find(|o| o.id == order_id).map(|o| o.status.clone())
  }

  pub fn calls(&self) -> usize {
    self.page_calls.load(Ordering::SeqCst)
  }
}

#[async_trait]
impl OrderSource for FakeSource {
  fn name(&self) -> &'static str {
    "fake"
  }

  async fn fetch_page(&self, query: &PageQuery) -> RelayResult<Page> {
    self.page_calls.fetch_add(1, Ordering::SeqCst);
    self.seen_queries.lock().push(query.clone());
    let delay = *self.delay.lock();
    if let Some(delay) = delay {
      tokio::time::sleep(delay).await;
    }
    if self.failing_pages.lock().contains(&query.page) {
      return Err(RelayError::UpstreamUnavailable {
        status: Some(503),
        body: "upstream down".to_string(),
      });
    }

    let mut matching: Vec<RawOrder> = self
      .orders
      .lock()
      .iter()
      .filter(|o| {
        // Unknown statuses pass through so the normaliser sees them.
        OrderStatus::from_source(&o.status).map_or(true, |s| query.statuses.contains(&s))
      })
      .cloned()
      .collect();
    match query.sort {
      SortOrder::Asc => matching.sort_by_key(|o| o.id),
      SortOrder::Desc => matching.sort_by_key(|o| std::cmp::Reverse(o.id)),
    }
    let per_page = query.effective_per_page() as usize;
    let start = (query.page.saturating_sub(1) as usize) * per_page;
    let orders: Vec<RawOrder> = matching.iter().skip(start).take(per_page).cloned().collect();
    let has_more = start + orders.len() < matching.len();
    Ok(Page { orders, has_more })
  }

  async fn fetch_order(&self, order_id: i64) -> RelayResult<RawOrder> {
    self
      .orders
      .lock()
      .iter()
      .find(|o| o.id == order_id)
      .cloned()
      .ok_or(RelayError::OrderNotFound(order_id))
  }
}

// --- Recording writer ---

pub struct FakeWriter {
  source: Arc<FakeSource>,
  reject_with: Mutex<Option<(u16, String)>>,
  pub writes: Mutex<Vec<(i64, OrderStatus)>>,
}

impl FakeWriter {
  pub fn new(source: Arc<FakeSource>) -> Arc<Self> {
    Arc::new(Self {
      source,
      reject_with: Mutex::new(None),
      writes: Mutex::new(Vec::new()),
    })
  }

  pub fn reject_with(&self, status: u16, body: &str) {
    *self.reject_with.lock() = Some((status, body.to_string()));
  }

  pub fn write_count(&self) -> usize {
    self.writes.lock().len()
  }
}

#[async_trait]
impl OrderWriter for FakeWriter {
  async fn update_status(&self, order_id: i64, status: OrderStatus) -> RelayResult<()> {
    let rejection = self.reject_with.lock().clone();
    if let Some((status, body)) = rejection {
      return Err(RelayError::UpstreamRejected { status, body });
    }
    self.writes.lock().push((order_id, status));
    self.source.set_status(order_id, status);
    Ok(())
  }
}

// --- Payment processor ---

#[derive(Default)]
pub struct FakePayments {
  pub refunded: Mutex<Vec<String>>,
  pub decline: Mutex<bool>,
}

#[async_trait]
impl PaymentProcessor for FakePayments {
  async fn refund(&self, charge_reference: &str) -> RelayResult<RefundReceipt> {
    if *self.decline.lock() {
      return Err(RelayError::Payment("card issuer declined".to_string()));
    }
    self.refunded.lock().push(charge_reference.to_string());
    Ok(RefundReceipt {
      id: format!("re_{}", charge_reference),
      status: "succeeded".to_string(),
    })
  }
}

// --- Notifier ---

#[derive(Default)]
pub struct RecordingNotifier {
  pub events: Mutex<Vec<OrderEvent>>,
}

impl Notifier for RecordingNotifier {
  fn publish(&self, event: OrderEvent) {
    self.events.lock().push(event);
  }
}

// --- Wiring ---

pub fn normalizer() -> Arc<Normalizer> {
  Arc::new(Normalizer::new(
    Arc::new(StoreAttributionTable::builtin()),
    NormalizerConfig::default(),
  ))
}

pub fn queries_over(source: Arc<FakeSource>) -> OrderQueries {
  let aggregator = Aggregator::new(source, normalizer());
  OrderQueries::new(aggregator, Arc::new(ResultCache::new()), CacheTtls::default())
}

pub struct RelayHarness {
  pub source: Arc<FakeSource>,
  pub writer: Arc<FakeWriter>,
  pub payments: Arc<FakePayments>,
  pub notifier: Arc<RecordingNotifier>,
  pub queries: OrderQueries,
  pub relay: CommandRelay,
}

pub fn relay_over(orders: Vec<RawOrder>, with_payments: bool) -> RelayHarness {
  let source = FakeSource::with_orders(orders);
  let writer = FakeWriter::new(source.clone());
  let payments = Arc::new(FakePayments::default());
  let notifier = Arc::new(RecordingNotifier::default());
  let queries = queries_over(source.clone());
  let relay = CommandRelay::new(RelayDeps {
    source: source.clone(),
    writer: writer.clone(),
    payments: if with_payments {
      Some(payments.clone() as Arc<dyn PaymentProcessor>)
    } else {
      None
    },
    queries: queries.clone(),
    notifier: notifier.clone(),
    normalizer: normalizer(),
  });
  RelayHarness {
    source,
    writer,
    payments,
    notifier,
    queries,
    relay,
  }
}

// --- Helper for Tracing Setup (call once per test run if needed) ---
static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}
