// core/src/source/sql.rs

//! Read-only order source over the shop's MySQL tables.
//!
//! Order attributes live as key/value rows in `postmeta`; one grouped join
//! folds them into a row per order with `MAX(CASE WHEN meta_key = .. THEN
//! meta_value END)`. Line items come from a second query per order.
// TODO: fold the per-order line-item query into one `IN (..)` query per page.

use super::{OrderSource, Page, PageQuery, SortOrder};
use crate::error::{RelayError, RelayResult};
use crate::model::{OrderStatus, RawBilling, RawLineItem, RawOrder};
use async_trait::async_trait;
use sqlx::mysql::MySqlPool;
use sqlx::FromRow;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, instrument};

const ORDER_POST_TYPE: &str = "shop_order";

#[derive(Debug, FromRow)]
struct OrderRow {
  order_id: i64,
  created_at: Option<String>,
  status: String,
  first_name: Option<String>,
  last_name: Option<String>,
  email: Option<String>,
  phone: Option<String>,
  payment_method: Option<String>,
  transaction_id: Option<String>,
  store_name: Option<String>,
}

#[derive(Debug, FromRow)]
struct LineItemRow {
  name: Option<String>,
  quantity: Option<String>,
  line_total: Option<String>,
  sku: Option<String>,
}

pub struct SqlOrderSource {
  pool: MySqlPool,
  table_prefix: String,
  timeout: Duration,
}

impl SqlOrderSource {
  /// `table_prefix` is spliced into SQL text, so only ASCII alphanumerics and
  /// `_` are accepted.
  pub fn new(pool: MySqlPool, table_prefix: impl Into<String>, timeout: Duration) -> RelayResult<Self> {
    let table_prefix = table_prefix.into();
    if !table_prefix.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
      return Err(RelayError::Validation(format!(
        "Table prefix '{}' may only contain letters, digits and '_'",
        table_prefix
      )));
    }
    Ok(Self {
      pool,
      table_prefix,
      timeout,
    })
  }

  fn orders_sql(&self, where_clause: &str, having_clause: &str, tail: &str) -> String {
    let p = &self.table_prefix;
    format!(
      "SELECT CAST(o.ID AS SIGNED) AS order_id, \
         DATE_FORMAT(o.post_date_gmt, '%Y-%m-%dT%H:%i:%s') AS created_at, \
         CAST(o.post_status AS CHAR) AS status, \
         CAST(MAX(CASE WHEN pm.meta_key = '_billing_first_name' THEN pm.meta_value END) AS CHAR) AS first_name, \
         CAST(MAX(CASE WHEN pm.meta_key = '_billing_last_name' THEN pm.meta_value END) AS CHAR) AS last_name, \
         CAST(MAX(CASE WHEN pm.meta_key = '_billing_email' THEN pm.meta_value END) AS CHAR) AS email, \
         CAST(MAX(CASE WHEN pm.meta_key = '_billing_phone' THEN pm.meta_value END) AS CHAR) AS phone, \
         CAST(MAX(CASE WHEN pm.meta_key = '_payment_method_title' THEN pm.meta_value END) AS CHAR) AS payment_method, \
         CAST(MAX(CASE WHEN pm.meta_key = '_transaction_id' THEN pm.meta_value END) AS CHAR) AS transaction_id, \
         CAST(MAX(CASE WHEN pm.meta_key = '_store_name' THEN pm.meta_value END) AS CHAR) AS store_name \
       FROM {p}posts o \
       LEFT JOIN {p}postmeta pm ON pm.post_id = o.ID \
       WHERE o.post_type = '{ORDER_POST_TYPE}' AND {where_clause} \
       GROUP BY o.ID, o.post_date_gmt, o.post_status \
       {having_clause} {tail}"
    )
  }

  fn line_items_sql(&self) -> String {
    let p = &self.table_prefix;
    format!(
      "SELECT li.name, li.quantity, li.line_total, CAST(sku.meta_value AS CHAR) AS sku \
       FROM ( \
         SELECT oi.order_item_id, \
           CAST(oi.order_item_name AS CHAR) AS name, \
           CAST(MAX(CASE WHEN im.meta_key = '_qty' THEN im.meta_value END) AS CHAR) AS quantity, \
           CAST(MAX(CASE WHEN im.meta_key = '_line_total' THEN im.meta_value END) AS CHAR) AS line_total, \
           MAX(CASE WHEN im.meta_key = '_product_id' THEN im.meta_value END) AS product_id \
         FROM {p}woocommerce_order_items oi \
         JOIN {p}woocommerce_order_itemmeta im ON im.order_item_id = oi.order_item_id \
         WHERE oi.order_id = ? AND oi.order_item_type = 'line_item' \
         GROUP BY oi.order_item_id, oi.order_item_name \
       ) li \
       LEFT JOIN {p}postmeta sku ON sku.post_id = li.product_id AND sku.meta_key = '_sku' \
       ORDER BY li.order_item_id"
    )
  }

  async fn bounded<T, F>(&self, fut: F) -> RelayResult<T>
  where
    F: Future<Output = Result<T, sqlx::Error>>,
  {
    match tokio::time::timeout(self.timeout, fut).await {
      Ok(Ok(value)) => Ok(value),
      Ok(Err(e)) => Err(RelayError::unavailable(None, e.to_string())),
      Err(_) => Err(RelayError::unavailable(
        None,
        format!("Order store query timed out after {:?}", self.timeout),
      )),
    }
  }

  async fn load_line_items(&self, order_id: i64) -> RelayResult<Vec<RawLineItem>> {
    let sql = self.line_items_sql();
    let rows: Vec<LineItemRow> = self
      .bounded(sqlx::query_as::<_, LineItemRow>(&sql).bind(order_id).fetch_all(&self.pool))
      .await?;
    Ok(rows.into_iter().map(LineItemRow::into_raw).collect())
  }

  async fn with_line_items(&self, row: OrderRow) -> RelayResult<RawOrder> {
    let line_items = self.load_line_items(row.order_id).await?;
    Ok(row.into_raw(line_items))
  }
}

impl OrderRow {
  fn into_raw(self, line_items: Vec<RawLineItem>) -> RawOrder {
    RawOrder {
      id: self.order_id,
      created_at: self.created_at,
      status: self.status,
      billing: RawBilling {
        first_name: self.first_name.unwrap_or_default(),
        last_name: self.last_name.unwrap_or_default(),
        email: self.email.unwrap_or_default(),
        phone: self.phone.unwrap_or_default(),
      },
      payment_method: self.payment_method,
      charge_reference: self.transaction_id.filter(|t| !t.trim().is_empty()),
      store: self.store_name,
      line_items,
    }
  }
}

impl LineItemRow {
  fn into_raw(self) -> RawLineItem {
    RawLineItem {
      sku: self.sku.unwrap_or_default(),
      name: self.name,
      // `_qty` is stored as text; anything unparsable falls back to one unit downstream.
      quantity: self.quantity.and_then(|q| q.trim().parse::<i64>().ok()),
      line_total: self.line_total,
    }
  }
}

fn status_placeholders(statuses: &[OrderStatus]) -> String {
  vec!["?"; statuses.len()].join(", ")
}

fn sort_keyword(sort: SortOrder) -> &'static str {
  match sort {
    SortOrder::Asc => "ASC",
    SortOrder::Desc => "DESC",
  }
}

#[async_trait]
impl OrderSource for SqlOrderSource {
  fn name(&self) -> &'static str {
    "sql"
  }

  #[instrument(name = "sql::fetch_page", skip(self), fields(page = query.page), err(Display))]
  async fn fetch_page(&self, query: &PageQuery) -> RelayResult<Page> {
    if query.statuses.is_empty() {
      return Err(RelayError::Validation("A page query needs at least one status".to_string()));
    }
    let per_page = query.effective_per_page();
    let offset = u64::from(query.page.saturating_sub(1)) * u64::from(per_page);
    let store_hint = query
      .store
      .as_deref()
      .map(str::trim)
      .filter(|s| !s.is_empty());

    let where_clause = format!("o.post_status IN ({})", status_placeholders(&query.statuses));
    let having_clause = if store_hint.is_some() {
      "HAVING store_name IS NULL OR store_name = '' OR LOWER(store_name) = LOWER(?)"
    } else {
      ""
    };
    // One extra row tells us whether another page exists.
    let tail = format!("ORDER BY o.ID {} LIMIT ? OFFSET ?", sort_keyword(query.sort));
    let sql = self.orders_sql(&where_clause, having_clause, &tail);

    let mut q = sqlx::query_as::<_, OrderRow>(&sql);
    for status in &query.statuses {
      q = q.bind(format!("wc-{}", status.as_str()));
    }
    if let Some(store) = store_hint {
      q = q.bind(store.to_string());
    }
    q = q.bind(u64::from(per_page) + 1).bind(offset);

    let mut rows = self.bounded(q.fetch_all(&self.pool)).await?;
    let has_more = rows.len() > per_page as usize;
    rows.truncate(per_page as usize);

    let mut orders = Vec::with_capacity(rows.len());
    for row in rows {
      orders.push(self.with_line_items(row).await?);
    }
    debug!(received = orders.len(), has_more, "Fetched order page from the order store.");
    Ok(Page { orders, has_more })
  }

  #[instrument(name = "sql::fetch_order", skip(self), err(Display))]
  async fn fetch_order(&self, order_id: i64) -> RelayResult<RawOrder> {
    let sql = self.orders_sql("o.ID = ?", "", "");
    let row: Option<OrderRow> = self
      .bounded(sqlx::query_as::<_, OrderRow>(&sql).bind(order_id).fetch_optional(&self.pool))
      .await?;
    match row {
      Some(row) => self.with_line_items(row).await,
      None => Err(RelayError::OrderNotFound(order_id)),
    }
  }
}
