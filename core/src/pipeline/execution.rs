// src/pipeline/execution.rs

//! `Pipeline::run()`: executes the steps in order, honoring skip
//! conditions, phase ordering, `Stop` signals, and first-error
//! short-circuiting.

use crate::core::context_data::ContextData;
use crate::core::control::{PipelineControl, PipelineResult};
use crate::error::ConductorError;
use crate::pipeline::definition::Pipeline;
use tracing::{event, instrument, span, Instrument, Level};

impl<TData, Err> Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<ConductorError> + Send + Sync + 'static,
{
  /// Executes the pipeline against the shared context `ctx_data`.
  ///
  /// Returns `Ok(Completed)` when every non-skipped step ran,
  /// `Ok(Stopped)` when a handler halted the flow, or the first handler
  /// error. A non-optional step with no handlers in any phase is a
  /// configuration fault and surfaces as `ConductorError::HandlerMissing`
  /// converted into `Err`.
  #[instrument(
        name = "Pipeline::run",
        skip_all,
        fields(
            context_type = %std::any::type_name::<TData>(),
            num_steps = self.steps.len(),
        ),
        err(Display)
    )]
  pub async fn run(&self, ctx_data: ContextData<TData>) -> Result<PipelineResult, Err> {
    event!(Level::DEBUG, "Pipeline execution starting.");

    for (step_idx, step_def) in self.steps.iter().enumerate() {
      let step_name_str = step_def.name.as_str();

      // Span guards must not be held across handler awaits (the run
      // future has to stay Send), so handler futures are instrumented
      // instead and the step span is entered only for sync sections.
      let step_span = span!(
        Level::INFO,
        "pipeline_step",
        step_name = step_name_str,
        step_index = step_idx,
        optional = step_def.optional
      );

      if let Some(skip_cond_fn) = &step_def.skip_if {
        if skip_cond_fn(ctx_data.clone()) {
          step_span.in_scope(|| event!(Level::DEBUG, "Step skipped by skip_if condition."));
          continue;
        }
      }

      let has_before = self.before.get(step_name_str).is_some_and(|v| !v.is_empty());
      let has_on = self.on.get(step_name_str).is_some_and(|v| !v.is_empty());
      let has_after = self.after.get(step_name_str).is_some_and(|v| !v.is_empty());

      if !has_before && !has_on && !has_after {
        if step_def.optional {
          step_span.in_scope(|| event!(Level::DEBUG, "Optional step has no handlers, skipping."));
          continue;
        }
        step_span.in_scope(|| event!(Level::ERROR, "Non-optional step has no handlers."));
        return Err(Err::from(ConductorError::HandlerMissing {
          step_name: step_def.name.clone(),
        }));
      }

      for (phase, handlers_map) in [("before", &self.before), ("on", &self.on), ("after", &self.after)] {
        let Some(handlers) = handlers_map.get(step_name_str) else {
          continue;
        };
        for (handler_idx, handler_fn) in handlers.iter().enumerate() {
          let handler_span = span!(
            parent: &step_span,
            Level::DEBUG,
            "step_handler",
            phase,
            handler_index = handler_idx
          );
          match handler_fn(ctx_data.clone()).instrument(handler_span).await {
            Ok(PipelineControl::Continue) => {}
            Ok(PipelineControl::Stop) => {
              step_span.in_scope(|| event!(Level::INFO, phase, "Pipeline stopped by handler."));
              return Ok(PipelineResult::Stopped);
            }
            Err(e) => {
              step_span.in_scope(|| event!(Level::ERROR, phase, error = %e, "Handler failed."));
              return Err(e);
            }
          }
        }
      }

      step_span.in_scope(|| event!(Level::DEBUG, "Step finished."));
    }

    event!(Level::DEBUG, "Pipeline execution completed.");
    Ok(PipelineResult::Completed)
  }
}
