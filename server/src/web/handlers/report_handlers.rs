// server/src/web/handlers/report_handlers.rs

use actix_web::{web, HttpResponse};
use orderdesk::reporting::{DEFAULT_TOP_N, MAX_TOP_N};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use crate::errors::{AppError, Result};
use crate::state::AppState;

#[derive(Deserialize, Debug, Default)]
pub struct TopParams {
  pub limit: Option<usize>,
}

fn top_n(raw: Option<usize>) -> Result<usize> {
  let n = raw.unwrap_or(DEFAULT_TOP_N);
  if (1..=MAX_TOP_N).contains(&n) {
    Ok(n)
  } else {
    Err(AppError::Validation(format!("limit must be between 1 and {}, got {}.", MAX_TOP_N, n)))
  }
}

fn store_name(raw: &str) -> Result<&str> {
  let store = raw.trim();
  if store.is_empty() {
    return Err(AppError::Validation("Store name must not be empty.".to_string()));
  }
  Ok(store)
}

#[instrument(name = "handler::top_customers", skip(app_state, params), fields(store = %store))]
pub async fn top_customers_handler(
  app_state: web::Data<AppState>,
  store: web::Path<String>,
  params: web::Query<TopParams>,
) -> Result<HttpResponse> {
  let n = top_n(params.limit)?;
  let store = store_name(&store)?;
  let top = app_state.queries.top_customers(store, n).await?;
  Ok(HttpResponse::Ok().json(json!({ "store": store, "top_customers": top })))
}

#[instrument(name = "handler::top_products", skip(app_state, params), fields(store = %store))]
pub async fn top_products_handler(
  app_state: web::Data<AppState>,
  store: web::Path<String>,
  params: web::Query<TopParams>,
) -> Result<HttpResponse> {
  let n = top_n(params.limit)?;
  let store = store_name(&store)?;
  let top = app_state.queries.top_products(store, n).await?;
  Ok(HttpResponse::Ok().json(json!({ "store": store, "top_products": top })))
}

#[instrument(name = "handler::total_sales", skip(app_state), fields(store = %store))]
pub async fn total_sales_handler(
  app_state: web::Data<AppState>,
  store: web::Path<String>,
) -> Result<HttpResponse> {
  let totals = app_state.queries.total_sales(store_name(&store)?).await?;
  Ok(HttpResponse::Ok().json(totals))
}
