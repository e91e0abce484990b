// server/src/web/handlers/order_handlers.rs

use actix_web::{web, HttpResponse};
use orderdesk::{SortOrder, StatusView};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};

use crate::errors::{AppError, Result};
use crate::state::AppState;

const DEFAULT_LATEST_LIMIT: u32 = 50;
const MAX_LATEST_LIMIT: u32 = 100;

#[derive(Deserialize, Debug, Default)]
pub struct ListingParams {
  pub shop: Option<String>,
  pub order: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
pub struct LatestParams {
  pub limit: Option<u32>,
}

pub async fn index_handler() -> HttpResponse {
  HttpResponse::Ok().json(json!({ "message": "orderdesk relay running" }))
}

pub async fn health_handler() -> HttpResponse {
  HttpResponse::Ok().json(json!({ "status": "ok" }))
}

fn parse_sort(raw: Option<&str>) -> Result<SortOrder> {
  match raw {
    Some(raw) => Ok(raw.parse::<SortOrder>()?),
    None => Ok(SortOrder::default()),
  }
}

/// Shared body of every listing route. Status and sort are validated before
/// the order source is touched.
async fn respond_with_listing(
  app_state: &AppState,
  raw_status: &str,
  store: Option<String>,
  raw_sort: Option<&str>,
) -> Result<HttpResponse> {
  let view: StatusView = raw_status.parse()?;
  let sort = parse_sort(raw_sort)?;
  let store = store.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());

  let listing = app_state.queries.orders(view, store.as_deref(), sort).await?;
  info!(
    status = %view,
    store = ?store,
    count = listing.len(),
    complete = listing.complete,
    "Listing served."
  );

  Ok(HttpResponse::Ok().json(json!({
    "status": view.as_str(),
    "store": store,
    "order": sort.as_str(),
    "count": listing.len(),
    "complete": listing.complete,
    "orders": listing.orders,
  })))
}

#[instrument(name = "handler::list_all_orders", skip(app_state, params))]
pub async fn list_all_orders_handler(
  app_state: web::Data<AppState>,
  params: web::Query<ListingParams>,
) -> Result<HttpResponse> {
  let params = params.into_inner();
  respond_with_listing(&app_state, "all", params.shop, params.order.as_deref()).await
}

#[instrument(name = "handler::list_orders", skip(app_state, params), fields(status = %status))]
pub async fn list_orders_handler(
  app_state: web::Data<AppState>,
  status: web::Path<String>,
  params: web::Query<ListingParams>,
) -> Result<HttpResponse> {
  let params = params.into_inner();
  respond_with_listing(&app_state, &status, params.shop, params.order.as_deref()).await
}

#[instrument(
  name = "handler::list_store_orders",
  skip(app_state, path, params),
  fields(status = %path.0, store = %path.1)
)]
pub async fn list_store_orders_handler(
  app_state: web::Data<AppState>,
  path: web::Path<(String, String)>,
  params: web::Query<ListingParams>,
) -> Result<HttpResponse> {
  let (status, store) = path.into_inner();
  if store.trim().is_empty() {
    return Err(AppError::Validation("Store name must not be empty.".to_string()));
  }
  respond_with_listing(&app_state, &status, Some(store), params.order.as_deref()).await
}

pub(crate) fn latest_limit(raw: Option<u32>) -> Result<u32> {
  let limit = raw.unwrap_or(DEFAULT_LATEST_LIMIT);
  if (1..=MAX_LATEST_LIMIT).contains(&limit) {
    Ok(limit)
  } else {
    Err(AppError::Validation(format!(
      "limit must be between 1 and {}, got {}.",
      MAX_LATEST_LIMIT, limit
    )))
  }
}

#[instrument(name = "handler::latest_orders", skip(app_state, params))]
pub async fn latest_orders_handler(
  app_state: web::Data<AppState>,
  params: web::Query<LatestParams>,
) -> Result<HttpResponse> {
  let limit = latest_limit(params.limit)?;
  let orders = app_state.queries.latest(limit).await?;
  Ok(HttpResponse::Ok().json(json!({
    "limit": limit,
    "count": orders.len(),
    "orders": orders,
  })))
}
