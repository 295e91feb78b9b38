// src/error.rs

use anyhow::Error as AnyhowError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConductorError {
  #[error("Step not found: {step_name}")]
  StepNotFound { step_name: String },

  #[error("Handler missing for non-optional step: {step_name}")]
  HandlerMissing { step_name: String },

  #[error("No pipeline registered for context type {context_type}")]
  PipelineNotRegistered { context_type: String },

  #[error("Type mismatch during context downcast (expected {expected_type})")]
  TypeMismatch { expected_type: String },

  #[error("Error in user-provided handler or external operation. Source: {source}")]
  HandlerError {
    #[source]
    source: AnyhowError,
  },

  #[error("Internal conductor error: {0}")]
  Internal(String),
}

// The catch-all conversion for external errors wrapped in anyhow.
impl From<AnyhowError> for ConductorError {
  fn from(err: AnyhowError) -> Self {
    ConductorError::HandlerError { source: err }
  }
}

pub type ConductorResult<T, E = ConductorError> = std::result::Result<T, E>;
