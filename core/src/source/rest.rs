// core/src/source/rest.rs

//! HTTP client for the upstream WooCommerce-style order API.

use super::{OrderSource, OrderWriter, Page, PageQuery};
use crate::error::{RelayError, RelayResult};
use crate::model::{OrderStatus, RawBilling, RawLineItem, RawOrder};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Order meta key carrying an explicit store name.
pub const STORE_META_KEY: &str = "_store_name";

const TOTAL_PAGES_HEADER: &str = "x-wp-totalpages";

#[derive(Debug, Clone)]
pub struct RestSourceConfig {
  /// API root, e.g. `https://shop.example/wp-json/wc/v3/`.
  pub base_url: String,
  pub consumer_key: String,
  pub consumer_secret: String,
  /// Bound applied to every call.
  pub timeout: Duration,
  pub accept_invalid_certs: bool,
}

/// Reads pages and single orders and writes status changes through the
/// upstream REST API, authenticating with the consumer key pair.
pub struct WooRestClient {
  client: Client,
  base_url: String,
  consumer_key: String,
  consumer_secret: String,
}

impl WooRestClient {
  pub fn new(config: RestSourceConfig) -> RelayResult<Self> {
    if config.accept_invalid_certs {
      warn!("TLS certificate verification is disabled for the order API.");
    }
    let client = Client::builder()
      .timeout(config.timeout)
      .danger_accept_invalid_certs(config.accept_invalid_certs)
      .build()
      .map_err(|e| RelayError::Internal(format!("Failed to build order API client: {}", e)))?;

    let mut base_url = config.base_url;
    if !base_url.ends_with('/') {
      base_url.push('/');
    }
    Ok(Self {
      client,
      base_url,
      consumer_key: config.consumer_key,
      consumer_secret: config.consumer_secret,
    })
  }

  fn endpoint(&self, path: &str) -> String {
    format!("{}{}", self.base_url, path)
  }

  async fn body_text(response: Response) -> String {
    response
      .text()
      .await
      .unwrap_or_else(|e| format!("<unreadable body: {}>", e))
  }
}

#[async_trait]
impl OrderSource for WooRestClient {
  fn name(&self) -> &'static str {
    "rest"
  }

  #[instrument(name = "rest::fetch_page", skip(self), fields(page = query.page), err(Display))]
  async fn fetch_page(&self, query: &PageQuery) -> RelayResult<Page> {
    let per_page = query.effective_per_page();
    let statuses = query
      .statuses
      .iter()
      .map(OrderStatus::as_str)
      .collect::<Vec<_>>()
      .join(",");

    let response = self
      .client
      .get(self.endpoint("orders"))
      .basic_auth(&self.consumer_key, Some(&self.consumer_secret))
      .query(&[
        ("page", query.page.to_string()),
        ("per_page", per_page.to_string()),
        ("status", statuses),
        ("order", query.sort.as_str().to_string()),
        ("orderby", "id".to_string()),
      ])
      .send()
      .await
      .map_err(|e| RelayError::unavailable(None, e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
      let body = Self::body_text(response).await;
      warn!(status = status.as_u16(), "Order API refused a page read.");
      return Err(RelayError::unavailable(Some(status.as_u16()), body));
    }

    let total_pages = response
      .headers()
      .get(TOTAL_PAGES_HEADER)
      .and_then(|v| v.to_str().ok())
      .and_then(|v| v.trim().parse::<u32>().ok());

    let records: Vec<JsonValue> = response
      .json()
      .await
      .map_err(|e| RelayError::unavailable(Some(status.as_u16()), format!("Unreadable order page: {}", e)))?;
    let received = records.len();
    let orders: Vec<RawOrder> = records
      .into_iter()
      .filter_map(|record| match parse_order_value(record) {
        Ok(order) => Some(order),
        Err(e) => {
          warn!(error = %e, "Skipping malformed order record from the order API.");
          None
        }
      })
      .collect();

    let has_more = match total_pages {
      Some(total) => query.page < total,
      None => received >= per_page as usize,
    } && received > 0;
    debug!(received, kept = orders.len(), has_more, "Fetched order page.");

    Ok(Page { orders, has_more })
  }

  #[instrument(name = "rest::fetch_order", skip(self), err(Display))]
  async fn fetch_order(&self, order_id: i64) -> RelayResult<RawOrder> {
    let response = self
      .client
      .get(self.endpoint(&format!("orders/{}", order_id)))
      .basic_auth(&self.consumer_key, Some(&self.consumer_secret))
      .send()
      .await
      .map_err(|e| RelayError::unavailable(None, e.to_string()))?;

    let status = response.status();
    if status == StatusCode::NOT_FOUND {
      return Err(RelayError::OrderNotFound(order_id));
    }
    if !status.is_success() {
      let body = Self::body_text(response).await;
      return Err(RelayError::unavailable(Some(status.as_u16()), body));
    }
    let record: JsonValue = response
      .json()
      .await
      .map_err(|e| RelayError::unavailable(Some(status.as_u16()), format!("Unreadable order: {}", e)))?;
    parse_order_value(record)
  }
}

#[async_trait]
impl OrderWriter for WooRestClient {
  #[instrument(name = "rest::update_status", skip(self), fields(status = %status), err(Display))]
  async fn update_status(&self, order_id: i64, status: OrderStatus) -> RelayResult<()> {
    let response = self
      .client
      .put(self.endpoint(&format!("orders/{}", order_id)))
      .basic_auth(&self.consumer_key, Some(&self.consumer_secret))
      .json(&serde_json::json!({ "status": status.as_str() }))
      .send()
      .await
      .map_err(|e| RelayError::unavailable(None, e.to_string()))?;

    let code = response.status();
    if code.is_success() {
      debug!("Order API accepted the status update.");
      return Ok(());
    }
    let body = Self::body_text(response).await;
    warn!(status = code.as_u16(), "Order API rejected the status update.");
    Err(RelayError::UpstreamRejected {
      status: code.as_u16(),
      body,
    })
  }
}

// --- Upstream JSON shape ---

#[derive(Debug, Deserialize)]
struct WooOrder {
  id: i64,
  #[serde(default)]
  date_created_gmt: Option<String>,
  #[serde(default)]
  status: String,
  #[serde(default)]
  billing: WooBilling,
  #[serde(default)]
  payment_method_title: Option<String>,
  #[serde(default)]
  transaction_id: Option<String>,
  #[serde(default)]
  line_items: Vec<WooLineItem>,
  #[serde(default)]
  meta_data: Vec<WooMeta>,
}

#[derive(Debug, Default, Deserialize)]
struct WooBilling {
  #[serde(default)]
  first_name: String,
  #[serde(default)]
  last_name: String,
  #[serde(default)]
  email: String,
  #[serde(default)]
  phone: String,
}

#[derive(Debug, Deserialize)]
struct WooLineItem {
  #[serde(default)]
  name: Option<String>,
  #[serde(default)]
  sku: Option<String>,
  #[serde(default)]
  quantity: Option<i64>,
  #[serde(default)]
  total: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WooMeta {
  key: String,
  #[serde(default)]
  value: JsonValue,
}

impl From<WooOrder> for RawOrder {
  fn from(o: WooOrder) -> Self {
    let store = o
      .meta_data
      .iter()
      .find(|m| m.key == STORE_META_KEY)
      .and_then(|m| m.value.as_str())
      .map(str::to_string);
    RawOrder {
      id: o.id,
      created_at: o.date_created_gmt,
      status: o.status,
      billing: RawBilling {
        first_name: o.billing.first_name,
        last_name: o.billing.last_name,
        email: o.billing.email,
        phone: o.billing.phone,
      },
      payment_method: o.payment_method_title,
      charge_reference: o.transaction_id.filter(|t| !t.trim().is_empty()),
      store,
      line_items: o
        .line_items
        .into_iter()
        .map(|li| RawLineItem {
          sku: li.sku.unwrap_or_default(),
          name: li.name,
          quantity: li.quantity,
          line_total: li.total,
        })
        .collect(),
    }
  }
}

fn parse_order_value(record: JsonValue) -> RelayResult<RawOrder> {
  let order_id = record.get("id").and_then(JsonValue::as_i64);
  serde_json::from_value::<WooOrder>(record)
    .map(RawOrder::from)
    .map_err(|e| RelayError::MalformedRecord {
      order_id,
      reason: e.to_string(),
    })
}

/// Parses an order object pushed by the upstream (webhook body).
///
/// Non-JSON input is a `Validation` error; JSON that is not an order is a
/// `MalformedRecord`.
pub fn parse_order_payload(bytes: &[u8]) -> RelayResult<RawOrder> {
  let value: JsonValue =
    serde_json::from_slice(bytes).map_err(|e| RelayError::Validation(format!("Invalid JSON payload: {}", e)))?;
  parse_order_value(value)
}
