// tests/common/mod.rs
#![allow(dead_code)] // Allow unused helpers in this shared test module

use conductor::{ConductorError, ContextData, PipelineControl};
use tracing::Level;

// --- Common context struct ---
#[derive(Clone, Debug, Default)]
pub struct TestContext {
  pub counter: i32,
  pub message: String,
  pub steps_executed: Vec<String>,
  pub should_stop_at: Option<String>,
}

// --- Common error type for tests ---
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum TestError {
  #[error("Conductor framework error: {0}")]
  Framework(String), // Stored as String so the enum stays Eq for assertions

  #[error("Test handler failed: {0}")]
  Handler(String),
}

impl From<ConductorError> for TestError {
  fn from(ce: ConductorError) -> Self {
    TestError::Framework(format!("{:?}", ce))
  }
}

// --- Handler creators ---
pub fn create_simple_handler(
  step_name: &'static str,
  message_to_append: &'static str,
) -> conductor::Handler<TestContext, TestError> {
  Box::new(move |ctx: ContextData<TestContext>| {
    let step_name_owned = step_name.to_string();
    Box::pin(async move {
      let mut guard = ctx.write();
      guard.counter += 1;
      guard.message.push_str(message_to_append);
      guard.steps_executed.push(step_name_owned.clone());
      tracing::debug!(target: "test_handlers", step = %step_name_owned, "executed, counter: {}", guard.counter);
      if let Some(stop_step) = &guard.should_stop_at {
        if stop_step == step_name_owned.as_str() {
          return Ok(PipelineControl::Stop);
        }
      }
      Ok(PipelineControl::Continue)
    })
  })
}

pub fn create_failing_handler(
  step_name: &'static str,
  error_message: &'static str,
) -> conductor::Handler<TestContext, TestError> {
  Box::new(move |ctx: ContextData<TestContext>| {
    let step_name_owned = step_name.to_string();
    let error_message_owned = error_message.to_string();
    Box::pin(async move {
      ctx.write().steps_executed.push(step_name_owned.clone());
      Err(TestError::Handler(error_message_owned))
    })
  })
}

// --- Tracing setup (idempotent across tests) ---
use once_cell::sync::Lazy;
static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}
