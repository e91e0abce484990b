// core/src/webhook.rs

//! Ingress for order notifications pushed by the order source, run as the
//! `webhook_ingest` pipeline:
//! `parse_payload` → `normalize_order` → `invalidate_cache` →
//! `notify_clients` → `schedule_warm`.
//!
//! A body that is not JSON is rejected. A JSON body that does not normalise
//! into an order is acknowledged and only schedules a warm.

use crate::cache::StatusChange;
use crate::error::RelayResult;
use crate::model::{NormalizedOrder, RawOrder};
use crate::normalizer::Normalizer;
use crate::notifier::{EventName, Notifier, OrderEvent};
use crate::pipeline::{skip_when, ContextData, Pipeline, PipelineControl};
use crate::service::OrderQueries;
use crate::source::rest::parse_order_payload;
use crate::warmer::WarmTrigger;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Upstream topic marking a newly created order.
pub const TOPIC_ORDER_CREATED: &str = "order.created";

pub struct WebhookDeps {
  pub normalizer: Arc<Normalizer>,
  pub queries: OrderQueries,
  pub notifier: Arc<dyn Notifier>,
  pub warm: Option<Arc<dyn WarmTrigger>>,
}

pub struct WebhookCtx {
  deps: Arc<WebhookDeps>,
  body: Vec<u8>,
  topic: Option<String>,
  raw: Option<RawOrder>,
  order: Option<NormalizedOrder>,
  event: Option<EventName>,
  invalidated: usize,
  warm_scheduled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WebhookOutcome {
  pub order_id: Option<i64>,
  pub event: Option<EventName>,
  pub invalidated: usize,
  pub warm_scheduled: bool,
}

fn event_for_topic(topic: Option<&str>) -> EventName {
  match topic.map(str::trim) {
    Some(t) if t.eq_ignore_ascii_case(TOPIC_ORDER_CREATED) => EventName::NewOrder,
    _ => EventName::OrderUpdated,
  }
}

pub fn build_webhook_pipeline() -> Pipeline<WebhookCtx> {
  let mut p = Pipeline::new(
    "webhook_ingest",
    &[
      ("parse_payload", false, None),
      ("normalize_order", false, skip_when(|c: &WebhookCtx| c.raw.is_none())),
      ("invalidate_cache", false, skip_when(|c: &WebhookCtx| c.order.is_none())),
      ("notify_clients", true, skip_when(|c: &WebhookCtx| c.order.is_none())),
      ("schedule_warm", true, None),
    ],
  );
  p.on("parse_payload", parse_payload);
  p.on("normalize_order", normalize_order);
  p.on("invalidate_cache", invalidate_cache);
  p.on("notify_clients", notify_clients);
  p.on("schedule_warm", schedule_warm);
  p
}

async fn parse_payload(ctx: ContextData<WebhookCtx>) -> RelayResult<PipelineControl> {
  let mut guard = ctx.write();
  let body = std::mem::take(&mut guard.body);
  match parse_order_payload(&body) {
    Ok(raw) => {
      debug!(order_id = raw.id, "Webhook payload parsed.");
      guard.raw = Some(raw);
      Ok(PipelineControl::Continue)
    }
    Err(e) if e.is_record_level() => {
      warn!(error = %e, "Webhook payload is not an order; acknowledging without changes.");
      Ok(PipelineControl::Continue)
    }
    Err(e) => Err(e),
  }
}

async fn normalize_order(ctx: ContextData<WebhookCtx>) -> RelayResult<PipelineControl> {
  let mut guard = ctx.write();
  let normalized = match &guard.raw {
    Some(raw) => guard.deps.normalizer.normalize(raw),
    None => return Ok(PipelineControl::Continue),
  };
  match normalized {
    Ok(order) => guard.order = Some(order),
    Err(e) if e.is_record_level() => {
      warn!(error = %e, "Webhook order could not be normalised; skipping invalidation.");
    }
    Err(e) => return Err(e),
  }
  Ok(PipelineControl::Continue)
}

async fn invalidate_cache(ctx: ContextData<WebhookCtx>) -> RelayResult<PipelineControl> {
  let mut guard = ctx.write();
  let change = match &guard.order {
    Some(order) => StatusChange {
      order_id: order.order_id(),
      // previous status is unknown to a webhook
      from: None,
      to: order.status(),
      store: Some(order.store().to_string()),
    },
    None => return Ok(PipelineControl::Continue),
  };
  let removed = guard.deps.queries.invalidate(&change);
  guard.invalidated = removed;
  Ok(PipelineControl::Continue)
}

async fn notify_clients(ctx: ContextData<WebhookCtx>) -> RelayResult<PipelineControl> {
  let mut guard = ctx.write();
  let event_name = event_for_topic(guard.topic.as_deref());
  let event = match &guard.order {
    Some(order) => OrderEvent::new(event_name, order.order_id(), order.status(), Some(order.store().to_string())),
    None => return Ok(PipelineControl::Continue),
  };
  guard.deps.notifier.publish(event);
  guard.event = Some(event_name);
  Ok(PipelineControl::Continue)
}

async fn schedule_warm(ctx: ContextData<WebhookCtx>) -> RelayResult<PipelineControl> {
  let mut guard = ctx.write();
  if let Some(warm) = guard.deps.warm.clone() {
    warm.trigger();
    guard.warm_scheduled = true;
  }
  Ok(PipelineControl::Continue)
}

#[derive(Clone)]
pub struct WebhookIngest {
  deps: Arc<WebhookDeps>,
  pipeline: Arc<Pipeline<WebhookCtx>>,
}

impl WebhookIngest {
  pub fn new(deps: WebhookDeps) -> Self {
    Self {
      deps: Arc::new(deps),
      pipeline: Arc::new(build_webhook_pipeline()),
    }
  }

  #[instrument(name = "WebhookIngest::handle", skip(self, body), fields(bytes = body.len()), err(Display))]
  pub async fn handle(&self, topic: Option<String>, body: Vec<u8>) -> RelayResult<WebhookOutcome> {
    let ctx = ContextData::new(WebhookCtx {
      deps: self.deps.clone(),
      body,
      topic,
      raw: None,
      order: None,
      event: None,
      invalidated: 0,
      warm_scheduled: false,
    });
    self.pipeline.run(ctx.clone()).await?;

    let guard = ctx.read();
    let outcome = WebhookOutcome {
      order_id: guard.order.as_ref().map(NormalizedOrder::order_id),
      event: guard.event,
      invalidated: guard.invalidated,
      warm_scheduled: guard.warm_scheduled,
    };
    info!(order_id = ?outcome.order_id, invalidated = outcome.invalidated, "Webhook processed.");
    Ok(outcome)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn topic_selects_event_name() {
    assert_eq!(event_for_topic(Some("order.created")), EventName::NewOrder);
    assert_eq!(event_for_topic(Some(" Order.Created ")), EventName::NewOrder);
    assert_eq!(event_for_topic(Some("order.updated")), EventName::OrderUpdated);
    assert_eq!(event_for_topic(None), EventName::OrderUpdated);
  }
}
