// core/src/pipeline/definition.rs

//! The `Pipeline<T>` struct and its construction API.

use super::context_data::ContextData;
use super::control::PipelineControl;
use super::step::{SkipCondition, StepDef};
use crate::error::RelayResult;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

/// A boxed step handler. It owns a clone of the run's `ContextData<T>` and
/// must release every lock guard before awaiting.
pub type Handler<T> =
  Box<dyn Fn(ContextData<T>) -> Pin<Box<dyn Future<Output = RelayResult<PipelineControl>> + Send>> + Send + Sync>;

/// An ordered list of named steps run against one shared context.
pub struct Pipeline<T>
where
  T: 'static + Send + Sync,
{
  /// Used as the `pipeline` field of every span the run emits.
  pub(crate) name: &'static str,
  pub(crate) steps: Vec<StepDef<T>>,
  pub(crate) handlers: HashMap<String, Vec<Handler<T>>>,
}

impl<T> Pipeline<T>
where
  T: 'static + Send + Sync,
{
  /// Creates a pipeline from `(step_name, optional, skip_if)` triples.
  pub fn new(name: &'static str, step_defs: &[(&str, bool, Option<SkipCondition<T>>)]) -> Self {
    let steps = step_defs
      .iter()
      .map(|(step_name, optional, skip_if)| StepDef {
        name: (*step_name).to_string(),
        optional: *optional,
        skip_if: skip_if.clone(),
      })
      .collect();

    Self {
      name,
      steps,
      handlers: HashMap::new(),
    }
  }

  /// Registers a handler for `step_name`. Handlers of one step run in
  /// registration order.
  ///
  /// Panics if the step was not declared: a misspelt step name is a wiring
  /// bug, not a runtime condition.
  pub fn on<F>(&mut self, step_name: &str, handler_fn: impl Fn(ContextData<T>) -> F + Send + Sync + 'static)
  where
    F: Future<Output = RelayResult<PipelineControl>> + Send + 'static,
  {
    if !self.steps.iter().any(|s| s.name == step_name) {
      panic!(
        "Pipeline '{}' setup error: step '{}' is not declared.",
        self.name, step_name
      );
    }
    let handler: Handler<T> = Box::new(move |ctx_data| Box::pin(handler_fn(ctx_data)));
    self.handlers.entry(step_name.to_string()).or_default().push(handler);
  }

  pub fn step_names(&self) -> Vec<&str> {
    self.steps.iter().map(|s| s.name.as_str()).collect()
  }
}
