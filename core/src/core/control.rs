// src/core/control.rs

//! Signals for controlling pipeline flow and the outcome of a run.

/// Signal from a handler indicating whether the pipeline should continue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineControl {
  /// Continue with the remaining handlers and steps.
  Continue,
  /// Halt the pipeline immediately. No further handlers in the current
  /// step or subsequent steps will run.
  Stop,
}

/// Outcome of a full pipeline execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineResult {
  /// Every non-skipped step ran to completion.
  Completed,
  /// A handler returned `PipelineControl::Stop`.
  Stopped,
}
