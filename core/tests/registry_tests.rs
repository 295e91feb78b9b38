// tests/registry_tests.rs
mod common;

use common::*;
use conductor::{Conductor, ConductorError, ContextData, Pipeline, PipelineResult};
use serial_test::serial;

#[derive(Clone, Debug, Default)]
struct OtherContext {
  tag: String,
}

fn build_test_pipeline() -> Pipeline<TestContext, TestError> {
  let mut p = Pipeline::<TestContext, TestError>::new(&[("only_step", false, None)]);
  p.on_root("only_step", create_simple_handler("only_step", "ran"));
  p
}

#[tokio::test]
#[serial]
async fn test_registry_dispatches_by_context_type() {
  setup_tracing();
  let conductor = Conductor::<TestError>::new();
  conductor.register_pipeline(build_test_pipeline());

  let ctx = ContextData::new(TestContext::default());
  let result = conductor.run(ctx.clone()).await;

  assert_eq!(result.unwrap(), PipelineResult::Completed);
  assert_eq!(ctx.read().message, "ran");
}

#[tokio::test]
#[serial]
async fn test_registry_errors_for_unregistered_context_type() {
  setup_tracing();
  let conductor = Conductor::<TestError>::new();
  conductor.register_pipeline(build_test_pipeline());

  let ctx = ContextData::new(OtherContext::default());
  let result = conductor.run(ctx).await;

  assert!(result.is_err());
  match result.err().unwrap() {
    TestError::Framework(msg) => assert!(msg.contains("PipelineNotRegistered"), "unexpected message: {}", msg),
    other => panic!("Expected TestError::Framework, got {:?}", other),
  }
}

#[tokio::test]
#[serial]
async fn test_registry_latest_registration_wins() {
  setup_tracing();
  let conductor = Conductor::<TestError>::new();
  conductor.register_pipeline(build_test_pipeline());

  let mut replacement = Pipeline::<TestContext, TestError>::new(&[("replacement_step", false, None)]);
  replacement.on_root("replacement_step", create_simple_handler("replacement_step", "replaced"));
  conductor.register_pipeline(replacement);

  let ctx = ContextData::new(TestContext::default());
  let result = conductor.run(ctx.clone()).await;

  assert_eq!(result.unwrap(), PipelineResult::Completed);
  assert_eq!(ctx.read().message, "replaced");
  assert_eq!(ctx.read().steps_executed, vec!["replacement_step"]);
}

#[tokio::test]
#[serial]
async fn test_registry_default_error_type() {
  setup_tracing();
  let conductor = Conductor::<ConductorError>::new();

  let mut p = Pipeline::<OtherContext, ConductorError>::new(&[("tag_step", false, None)]);
  p.on_root("tag_step", |ctx: ContextData<OtherContext>| {
    Box::pin(async move {
      ctx.write().tag = "tagged".to_string();
      Ok::<_, ConductorError>(conductor::PipelineControl::Continue)
    })
  });
  conductor.register_pipeline(p);

  let ctx = ContextData::new(OtherContext::default());
  let result = conductor.run(ctx.clone()).await;

  assert_eq!(result.unwrap(), PipelineResult::Completed);
  assert_eq!(ctx.read().tag, "tagged");
}
