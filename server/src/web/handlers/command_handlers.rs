// server/src/web/handlers/command_handlers.rs

use actix_web::{web, HttpResponse};
use orderdesk::Transition;
use tracing::{info, instrument};

use crate::errors::{AppError, Result};
use crate::state::AppState;
use crate::web::extractors::AdminAccess;

fn order_id(raw: &str) -> Result<i64> {
  raw
    .trim()
    .parse::<i64>()
    .ok()
    .filter(|id| *id > 0)
    .ok_or_else(|| AppError::Validation(format!("'{}' is not a valid order id.", raw)))
}

async fn run_transition(app_state: &AppState, raw_id: &str, transition: Transition) -> Result<HttpResponse> {
  let order_id = order_id(raw_id)?;
  let outcome = app_state.relay.run(order_id, transition).await?;
  info!(
    order_id,
    action = transition.action(),
    status = %outcome.status,
    changed = outcome.changed,
    "Order action relayed."
  );
  Ok(HttpResponse::Ok().json(outcome))
}

#[instrument(name = "handler::prepare_order", skip(app_state, _admin), fields(order_id = %id))]
pub async fn prepare_order_handler(
  app_state: web::Data<AppState>,
  id: web::Path<String>,
  _admin: AdminAccess,
) -> Result<HttpResponse> {
  run_transition(&app_state, &id, Transition::Prepare).await
}

#[instrument(name = "handler::ready_order", skip(app_state, _admin), fields(order_id = %id))]
pub async fn ready_order_handler(
  app_state: web::Data<AppState>,
  id: web::Path<String>,
  _admin: AdminAccess,
) -> Result<HttpResponse> {
  run_transition(&app_state, &id, Transition::MarkReady).await
}

#[instrument(name = "handler::complete_order", skip(app_state, _admin), fields(order_id = %id))]
pub async fn complete_order_handler(
  app_state: web::Data<AppState>,
  id: web::Path<String>,
  _admin: AdminAccess,
) -> Result<HttpResponse> {
  run_transition(&app_state, &id, Transition::Complete).await
}

#[instrument(name = "handler::refund_order", skip(app_state, _admin), fields(order_id = %id))]
pub async fn refund_order_handler(
  app_state: web::Data<AppState>,
  id: web::Path<String>,
  _admin: AdminAccess,
) -> Result<HttpResponse> {
  run_transition(&app_state, &id, Transition::Refund).await
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn order_ids_must_be_positive_integers() {
    assert_eq!(order_id("42").unwrap(), 42);
    assert_eq!(order_id(" 7 ").unwrap(), 7);
    assert!(order_id("0").is_err());
    assert!(order_id("-3").is_err());
    assert!(order_id("abc").is_err());
  }
}
