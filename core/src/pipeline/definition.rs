// src/pipeline/definition.rs

//! The `Pipeline<TData, Err>` struct definition and construction.

use crate::core::handler::Handler;
use crate::core::step::{SkipCondition, StepDef};
use std::collections::HashMap;

/// An ordered flow of named steps over a shared context of type `TData`.
///
/// `TData` must be `'static + Send + Sync`. `Err` is the error type that
/// handlers return; it must be convertible from `ConductorError` so
/// framework-level failures (e.g. a non-optional step with no handlers)
/// surface through the same channel as handler failures.
pub struct Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<crate::error::ConductorError> + Send + Sync + 'static,
{
  /// Ordered step definitions.
  pub(crate) steps: Vec<StepDef<TData>>,

  // Handlers for the three phases of each step, keyed by step name.
  pub(crate) before: HashMap<String, Vec<Handler<TData, Err>>>,
  pub(crate) on: HashMap<String, Vec<Handler<TData, Err>>>,
  pub(crate) after: HashMap<String, Vec<Handler<TData, Err>>>,
}

impl<TData, Err> Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<crate::error::ConductorError> + Send + Sync + 'static,
{
  /// Creates a pipeline from `(name, optional, skip_if)` step tuples.
  pub fn new(step_defs: &[(&str, bool, Option<SkipCondition<TData>>)]) -> Self {
    let steps = step_defs
      .iter()
      .map(|(name, optional, skip_cond_opt)| StepDef {
        name: (*name).to_string(),
        optional: *optional,
        skip_if: skip_cond_opt.clone(),
      })
      .collect();

    Self {
      steps,
      before: HashMap::new(),
      on: HashMap::new(),
      after: HashMap::new(),
    }
  }

  /// Panics if the named step is absent. Registering a handler against a
  /// step that was never defined is a programming error, not a runtime
  /// condition, so it fails fast at setup time.
  pub(crate) fn ensure_step_exists(&self, step_name: &str) {
    if !self.steps.iter().any(|s| s.name == step_name) {
      panic!(
        "Conductor setup error: step '{}' not found in pipeline definition.",
        step_name
      );
    }
  }

  /// Names of the defined steps, in execution order.
  pub fn step_names(&self) -> Vec<&str> {
    self.steps.iter().map(|s| s.name.as_str()).collect()
  }
}
