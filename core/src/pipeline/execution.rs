// core/src/pipeline/execution.rs

//! `Pipeline::run()`: executes steps in order against a shared context.

use super::context_data::ContextData;
use super::control::{PipelineControl, PipelineResult};
use super::definition::Pipeline;
use crate::error::{RelayError, RelayResult};
use tracing::{event, instrument, Instrument, Level};

impl<T> Pipeline<T>
where
  T: 'static + Send + Sync,
{
  /// Runs every step against `ctx_data`.
  ///
  /// A step whose skip condition holds is passed over. A non-optional step
  /// without handlers fails the run with `RelayError::HandlerMissing`. The
  /// first handler error aborts the run and is returned unchanged.
  #[instrument(
    name = "Pipeline::run",
    skip_all,
    fields(pipeline = self.name, num_steps = self.steps.len()),
    err(Display)
  )]
  pub async fn run(&self, ctx_data: ContextData<T>) -> RelayResult<PipelineResult> {
    event!(Level::DEBUG, "Pipeline execution starting.");

    for (step_idx, step_def) in self.steps.iter().enumerate() {
      let step_span = tracing::info_span!(
        "pipeline_step",
        step_name = step_def.name.as_str(),
        step_index = step_idx,
        optional = step_def.optional
      );

      if step_def.should_skip(&ctx_data) {
        event!(parent: &step_span, Level::DEBUG, "Step skipped due to 'skip_if' condition.");
        continue;
      }

      let handlers = match self.handlers.get(&step_def.name) {
        Some(handlers) if !handlers.is_empty() => handlers,
        _ if step_def.optional => {
          event!(parent: &step_span, Level::DEBUG, "Optional step has no handlers, skipping.");
          continue;
        }
        _ => {
          event!(parent: &step_span, Level::ERROR, "Non-optional step has no handlers.");
          return Err(RelayError::HandlerMissing {
            step_name: step_def.name.clone(),
          });
        }
      };

      for handler_fn in handlers {
        match handler_fn(ctx_data.clone()).instrument(step_span.clone()).await {
          Ok(PipelineControl::Continue) => {}
          Ok(PipelineControl::Stop) => {
            event!(parent: &step_span, Level::INFO, "Pipeline stopped by a handler.");
            return Ok(PipelineResult::Stopped);
          }
          Err(e) => {
            event!(parent: &step_span, Level::WARN, error = %e, "Step handler failed.");
            return Err(e);
          }
        }
      }
    }

    event!(Level::DEBUG, "Pipeline execution completed.");
    Ok(PipelineResult::Completed)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::pipeline::skip_when;

  #[derive(Default)]
  struct Trace {
    visited: Vec<&'static str>,
    skip_middle: bool,
  }

  fn visit(name: &'static str) -> impl Fn(ContextData<Trace>) -> std::future::Ready<RelayResult<PipelineControl>> {
    move |ctx| {
      ctx.write().visited.push(name);
      std::future::ready(Ok(PipelineControl::Continue))
    }
  }

  #[tokio::test]
  async fn runs_steps_in_declared_order() {
    let mut p = Pipeline::<Trace>::new("trace", &[("a", false, None), ("b", false, None), ("c", false, None)]);
    p.on("c", visit("c"));
    p.on("a", visit("a"));
    p.on("b", visit("b"));

    let ctx = ContextData::new(Trace::default());
    assert_eq!(p.run(ctx.clone()).await.unwrap(), PipelineResult::Completed);
    assert_eq!(ctx.read().visited, vec!["a", "b", "c"]);
  }

  #[tokio::test]
  async fn skip_condition_and_optional_steps_are_passed_over() {
    let mut p = Pipeline::<Trace>::new(
      "trace",
      &[
        ("a", false, None),
        ("b", false, skip_when(|t: &Trace| t.skip_middle)),
        ("unhandled", true, None),
        ("c", false, None),
      ],
    );
    p.on("a", visit("a"));
    p.on("b", visit("b"));
    p.on("c", visit("c"));

    let ctx = ContextData::new(Trace {
      skip_middle: true,
      ..Trace::default()
    });
    assert_eq!(p.run(ctx.clone()).await.unwrap(), PipelineResult::Completed);
    assert_eq!(ctx.read().visited, vec!["a", "c"]);
  }

  #[tokio::test]
  async fn stop_halts_remaining_steps() {
    let mut p = Pipeline::<Trace>::new("trace", &[("a", false, None), ("halt", false, None), ("c", false, None)]);
    p.on("a", visit("a"));
    p.on("halt", |_ctx: ContextData<Trace>| async { Ok::<_, RelayError>(PipelineControl::Stop) });
    p.on("c", visit("c"));

    let ctx = ContextData::new(Trace::default());
    assert_eq!(p.run(ctx.clone()).await.unwrap(), PipelineResult::Stopped);
    assert_eq!(ctx.read().visited, vec!["a"]);
  }

  #[tokio::test]
  async fn missing_handler_on_required_step_fails() {
    let p = Pipeline::<Trace>::new("trace", &[("required", false, None)]);
    let err = p.run(ContextData::new(Trace::default())).await.unwrap_err();
    assert!(matches!(err, RelayError::HandlerMissing { step_name } if step_name == "required"));
  }

  #[tokio::test]
  async fn handler_error_is_returned_unchanged() {
    let mut p = Pipeline::<Trace>::new("trace", &[("bad", false, None), ("never", false, None)]);
    p.on("bad", |_ctx: ContextData<Trace>| async {
      Err::<PipelineControl, _>(RelayError::Validation("nope".to_string()))
    });
    p.on("never", visit("never"));

    let ctx = ContextData::new(Trace::default());
    let err = p.run(ctx.clone()).await.unwrap_err();
    assert!(matches!(err, RelayError::Validation(m) if m == "nope"));
    assert!(ctx.read().visited.is_empty());
  }

  #[test]
  #[should_panic(expected = "not declared")]
  fn registering_on_unknown_step_panics() {
    let mut p = Pipeline::<Trace>::new("trace", &[("a", false, None)]);
    p.on("typo", visit("typo"));
  }
}
