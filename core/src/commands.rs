// core/src/commands.rs

//! Command relay: admin-triggered status transitions forwarded to the order
//! source, run as the `status_transition` pipeline.
//!
//! Steps: `load_current_order` → `check_transition` →
//! `resolve_charge_reference` → `issue_refund` → `write_status` →
//! `invalidate_cache` → `notify_clients`. The two refund steps only run for
//! [`Transition::Refund`]. Each write is sent once; nothing is retried.

use crate::cache::StatusChange;
use crate::error::{RelayError, RelayResult};
use crate::model::{OrderStatus, RawOrder};
use crate::normalizer::Normalizer;
use crate::notifier::{EventName, Notifier, OrderEvent};
use crate::payment::{PaymentProcessor, RefundReceipt};
use crate::pipeline::{skip_when, ContextData, Pipeline, PipelineControl, PipelineResult};
use crate::service::OrderQueries;
use crate::source::{OrderSource, OrderWriter};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{error, event, info, instrument, warn, Level};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
  Prepare,
  MarkReady,
  Complete,
  Refund,
}

impl Transition {
  pub const ALL: [Transition; 4] = [
    Transition::Prepare,
    Transition::MarkReady,
    Transition::Complete,
    Transition::Refund,
  ];

  pub fn target(&self) -> OrderStatus {
    match self {
      Transition::Prepare => OrderStatus::Preparing,
      Transition::MarkReady => OrderStatus::Ready,
      Transition::Complete => OrderStatus::Completed,
      Transition::Refund => OrderStatus::Refunded,
    }
  }

  /// The `{action}` part of `/{action}-order/{id}`.
  pub fn action(&self) -> &'static str {
    match self {
      Transition::Prepare => "prepare",
      Transition::MarkReady => "ready",
      Transition::Complete => "complete",
      Transition::Refund => "refund",
    }
  }
}

impl fmt::Display for Transition {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.action())
  }
}

impl FromStr for Transition {
  type Err = RelayError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let wanted = s.trim().to_ascii_lowercase();
    Transition::ALL
      .into_iter()
      .find(|t| t.action() == wanted)
      .ok_or_else(|| RelayError::Validation(format!("Unknown order action '{}'", s)))
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionCheck {
  Apply,
  /// Target equals the current status; nothing to do.
  AlreadyApplied,
}

/// Moves along `processing → preparing → ready → completed` go forward only,
/// skips allowed. `refunded` is reachable from anywhere and left from nowhere.
pub fn check_transition(from: OrderStatus, to: OrderStatus) -> RelayResult<TransitionCheck> {
  if from == to {
    return Ok(TransitionCheck::AlreadyApplied);
  }
  if from == OrderStatus::Refunded {
    return Err(RelayError::Validation(format!(
      "Order is refunded; it cannot move to '{}'",
      to
    )));
  }
  match (from.fulfilment_rank(), to.fulfilment_rank()) {
    (_, None) => Ok(TransitionCheck::Apply),
    (Some(a), Some(b)) if a < b => Ok(TransitionCheck::Apply),
    _ => Err(RelayError::Validation(format!(
      "Order cannot move back from '{}' to '{}'",
      from, to
    ))),
  }
}

/// Collaborators of the write path.
pub struct RelayDeps {
  pub source: Arc<dyn OrderSource>,
  pub writer: Arc<dyn OrderWriter>,
  /// `None` makes every refund fail with `Payment`.
  pub payments: Option<Arc<dyn PaymentProcessor>>,
  pub queries: OrderQueries,
  pub notifier: Arc<dyn Notifier>,
  pub normalizer: Arc<Normalizer>,
}

pub struct TransitionCtx {
  deps: Arc<RelayDeps>,
  order_id: i64,
  transition: Transition,
  order: Option<RawOrder>,
  previous: Option<OrderStatus>,
  store: Option<String>,
  charge_reference: Option<String>,
  refund: Option<RefundReceipt>,
  changed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransitionOutcome {
  pub order_id: i64,
  pub action: Transition,
  pub status: OrderStatus,
  pub previous: Option<OrderStatus>,
  /// `false` when the order already had the target status.
  pub changed: bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub store: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub refund: Option<RefundReceipt>,
}

fn not_refund(ctx: &TransitionCtx) -> bool {
  ctx.transition != Transition::Refund
}

pub fn build_transition_pipeline() -> Pipeline<TransitionCtx> {
  let mut p = Pipeline::new(
    "status_transition",
    &[
      ("load_current_order", false, None),
      ("check_transition", false, None),
      ("resolve_charge_reference", false, skip_when(not_refund)),
      ("issue_refund", false, skip_when(not_refund)),
      ("write_status", false, None),
      ("invalidate_cache", false, None),
      ("notify_clients", true, None),
    ],
  );
  p.on("load_current_order", load_current_order);
  p.on("check_transition", check_step);
  p.on("resolve_charge_reference", resolve_charge_reference);
  p.on("issue_refund", issue_refund);
  p.on("write_status", write_status);
  p.on("invalidate_cache", invalidate_cache);
  p.on("notify_clients", notify_clients);
  p
}

async fn load_current_order(ctx: ContextData<TransitionCtx>) -> RelayResult<PipelineControl> {
  let (deps, order_id) = {
    let guard = ctx.read();
    (guard.deps.clone(), guard.order_id)
  };

  let order = deps.source.fetch_order(order_id).await?;
  let current = OrderStatus::from_source(&order.status).ok_or_else(|| RelayError::MalformedRecord {
    order_id: Some(order_id),
    reason: format!("current status '{}' is outside the order vocabulary", order.status),
  })?;
  let store = deps.normalizer.attribution().resolve(&order);
  event!(Level::DEBUG, order_id, current = %current, store = %store, "Loaded current order.");

  let mut guard = ctx.write();
  guard.previous = Some(current);
  guard.store = Some(store);
  guard.order = Some(order);
  Ok(PipelineControl::Continue)
}

async fn check_step(ctx: ContextData<TransitionCtx>) -> RelayResult<PipelineControl> {
  let guard = ctx.read();
  let current = guard
    .previous
    .ok_or_else(|| RelayError::Internal("Current status missing before transition check".to_string()))?;
  match check_transition(current, guard.transition.target())? {
    TransitionCheck::Apply => Ok(PipelineControl::Continue),
    TransitionCheck::AlreadyApplied => {
      info!(order_id = guard.order_id, status = %current, "Order already has the target status; nothing to do.");
      Ok(PipelineControl::Stop)
    }
  }
}

async fn resolve_charge_reference(ctx: ContextData<TransitionCtx>) -> RelayResult<PipelineControl> {
  let mut guard = ctx.write();
  let reference = guard
    .order
    .as_ref()
    .and_then(|o| o.charge_reference.clone())
    .filter(|r| !r.trim().is_empty());
  match reference {
    Some(reference) => {
      guard.charge_reference = Some(reference);
      Ok(PipelineControl::Continue)
    }
    None => {
      warn!(order_id = guard.order_id, "Refund requested for an order without a charge reference.");
      Err(RelayError::ChargeReferenceMissing {
        order_id: guard.order_id,
      })
    }
  }
}

async fn issue_refund(ctx: ContextData<TransitionCtx>) -> RelayResult<PipelineControl> {
  let (deps, reference) = {
    let guard = ctx.read();
    (guard.deps.clone(), guard.charge_reference.clone())
  };
  let reference =
    reference.ok_or_else(|| RelayError::Internal("Charge reference missing at refund step".to_string()))?;
  let payments = deps
    .payments
    .as_ref()
    .ok_or_else(|| RelayError::Payment("No payment processor is configured".to_string()))?;

  let receipt = payments.refund(&reference).await?;
  ctx.write().refund = Some(receipt);
  Ok(PipelineControl::Continue)
}

async fn write_status(ctx: ContextData<TransitionCtx>) -> RelayResult<PipelineControl> {
  let (deps, order_id, target, refunded) = {
    let guard = ctx.read();
    (
      guard.deps.clone(),
      guard.order_id,
      guard.transition.target(),
      guard.refund.is_some(),
    )
  };

  if let Err(e) = deps.writer.update_status(order_id, target).await {
    if refunded {
      error!(order_id, error = %e, "Refund was issued but the status write failed; order needs manual attention.");
    }
    return Err(e);
  }
  ctx.write().changed = true;
  Ok(PipelineControl::Continue)
}

async fn invalidate_cache(ctx: ContextData<TransitionCtx>) -> RelayResult<PipelineControl> {
  let guard = ctx.read();
  let change = StatusChange {
    order_id: guard.order_id,
    from: guard.previous,
    to: guard.transition.target(),
    store: guard.store.clone(),
  };
  guard.deps.queries.invalidate(&change);
  Ok(PipelineControl::Continue)
}

async fn notify_clients(ctx: ContextData<TransitionCtx>) -> RelayResult<PipelineControl> {
  let guard = ctx.read();
  guard.deps.notifier.publish(OrderEvent::new(
    EventName::OrderStatusChanged,
    guard.order_id,
    guard.transition.target(),
    guard.store.clone(),
  ));
  Ok(PipelineControl::Continue)
}

/// Runs transitions against shared collaborators.
#[derive(Clone)]
pub struct CommandRelay {
  deps: Arc<RelayDeps>,
  pipeline: Arc<Pipeline<TransitionCtx>>,
}

impl CommandRelay {
  pub fn new(deps: RelayDeps) -> Self {
    Self {
      deps: Arc::new(deps),
      pipeline: Arc::new(build_transition_pipeline()),
    }
  }

  #[instrument(name = "CommandRelay::run", skip(self), fields(action = %transition), err(Display))]
  pub async fn run(&self, order_id: i64, transition: Transition) -> RelayResult<TransitionOutcome> {
    let ctx = ContextData::new(TransitionCtx {
      deps: self.deps.clone(),
      order_id,
      transition,
      order: None,
      previous: None,
      store: None,
      charge_reference: None,
      refund: None,
      changed: false,
    });

    let result = self.pipeline.run(ctx.clone()).await?;
    let mut guard = ctx.write();
    let outcome = TransitionOutcome {
      order_id,
      action: transition,
      status: transition.target(),
      previous: guard.previous,
      changed: guard.changed,
      store: guard.store.take(),
      refund: guard.refund.take(),
    };
    match result {
      PipelineResult::Completed => info!(order_id, status = %outcome.status, "Status transition relayed."),
      PipelineResult::Stopped => info!(order_id, "Status transition was a no-op."),
    }
    Ok(outcome)
  }
}
