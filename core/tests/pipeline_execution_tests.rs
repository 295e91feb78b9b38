// tests/pipeline_execution_tests.rs
mod common;

use common::*;
use conductor::{ConductorError, ContextData, Pipeline, PipelineControl, PipelineResult};
use serial_test::serial;
use std::sync::Arc;

#[tokio::test]
#[serial]
async fn test_pipeline_runs_steps_in_order() {
  setup_tracing();
  let mut pipeline =
    Pipeline::<TestContext, TestError>::new(&[("step1", false, None), ("step2", false, None), ("step3", false, None)]);

  pipeline.on_root("step1", create_simple_handler("step1", " S1"));
  pipeline.on_root("step2", create_simple_handler("step2", " S2"));
  pipeline.on_root("step3", create_simple_handler("step3", " S3"));

  assert_eq!(pipeline.step_names(), vec!["step1", "step2", "step3"]);

  let ctx = ContextData::new(TestContext::default());
  let result = pipeline.run(ctx.clone()).await;

  assert!(result.is_ok());
  assert_eq!(result.unwrap(), PipelineResult::Completed);

  let guard = ctx.read();
  assert_eq!(guard.counter, 3);
  assert_eq!(guard.message, " S1 S2 S3");
  assert_eq!(guard.steps_executed, vec!["step1", "step2", "step3"]);
}

#[tokio::test]
#[serial]
async fn test_pipeline_stops_on_pipeline_control_stop() {
  setup_tracing();
  let mut pipeline = Pipeline::<TestContext, TestError>::new(&[
    ("stepA", false, None),
    ("stopStep", false, None),
    ("stepC", false, None),
  ]);

  pipeline.on_root("stepA", create_simple_handler("stepA", "A"));
  pipeline.on_root("stopStep", |ctx: ContextData<TestContext>| {
    Box::pin(async move {
      ctx.write().steps_executed.push("stopStep".to_string());
      Ok::<PipelineControl, TestError>(PipelineControl::Stop)
    })
  });
  pipeline.on_root("stepC", create_simple_handler("stepC", "C")); // Must not run

  let ctx = ContextData::new(TestContext::default());
  let result = pipeline.run(ctx.clone()).await;

  assert_eq!(result.unwrap(), PipelineResult::Stopped);

  let guard = ctx.read();
  assert_eq!(guard.counter, 1);
  assert_eq!(guard.message, "A");
  assert_eq!(guard.steps_executed, vec!["stepA", "stopStep"]);
}

#[tokio::test]
#[serial]
async fn test_pipeline_propagates_handler_error() {
  setup_tracing();
  let mut pipeline = Pipeline::<TestContext, TestError>::new(&[
    ("good_step", false, None),
    ("bad_step", false, None),
    ("another_step", false, None),
  ]);

  pipeline.on_root("good_step", create_simple_handler("good_step", "Good"));
  pipeline.on_root("bad_step", create_failing_handler("bad_step", "I am a bad step!"));
  pipeline.on_root("another_step", create_simple_handler("another_step", "NeverRun"));

  let ctx = ContextData::new(TestContext::default());
  let result = pipeline.run(ctx.clone()).await;

  assert!(result.is_err());
  match result.err().unwrap() {
    TestError::Handler(msg) => assert_eq!(msg, "I am a bad step!"),
    other => panic!("Expected TestError::Handler, got {:?}", other),
  }

  let guard = ctx.read();
  assert_eq!(guard.counter, 1); // Only good_step incremented
  assert_eq!(guard.steps_executed, vec!["good_step", "bad_step"]);
}

#[tokio::test]
#[serial]
async fn test_pipeline_skips_step_if_condition_met() {
  setup_tracing();
  let mut pipeline = Pipeline::<TestContext, TestError>::new(&[
    ("step1", false, None),
    (
      "step_to_skip",
      false,
      Some(Arc::new(|ctx: ContextData<TestContext>| ctx.read().counter > 0)),
    ),
    ("step3", false, None),
  ]);

  pipeline.on_root("step1", create_simple_handler("step1", " S1"));
  pipeline.on_root("step_to_skip", create_simple_handler("step_to_skip", " SKIPPED"));
  pipeline.on_root("step3", create_simple_handler("step3", " S3"));

  let ctx = ContextData::new(TestContext::default());
  let result = pipeline.run(ctx.clone()).await;

  assert_eq!(result.unwrap(), PipelineResult::Completed);
  let guard = ctx.read();
  assert_eq!(guard.counter, 2); // step1 and step3 ran
  assert_eq!(guard.message, " S1 S3");
  assert_eq!(guard.steps_executed, vec!["step1", "step3"]);
}

#[tokio::test]
#[serial]
async fn test_before_and_after_hooks_run_around_on() {
  setup_tracing();
  let mut pipeline = Pipeline::<TestContext, TestError>::new(&[("step1", false, None)]);

  pipeline.before_root("step1", |ctx: ContextData<TestContext>| {
    Box::pin(async move {
      ctx.write().message.push_str("B");
      Ok::<_, TestError>(PipelineControl::Continue)
    })
  });
  pipeline.on_root("step1", |ctx: ContextData<TestContext>| {
    Box::pin(async move {
      ctx.write().message.push_str("O");
      Ok::<_, TestError>(PipelineControl::Continue)
    })
  });
  pipeline.after_root("step1", |ctx: ContextData<TestContext>| {
    Box::pin(async move {
      ctx.write().message.push_str("A");
      Ok::<_, TestError>(PipelineControl::Continue)
    })
  });

  let ctx = ContextData::new(TestContext::default());
  let result = pipeline.run(ctx.clone()).await;

  assert_eq!(result.unwrap(), PipelineResult::Completed);
  assert_eq!(ctx.read().message, "BOA");
}

#[tokio::test]
#[serial]
async fn test_before_hook_stop_skips_step_body() {
  setup_tracing();
  let mut pipeline = Pipeline::<TestContext, TestError>::new(&[("step1", false, None), ("step2", false, None)]);

  pipeline.before_root("step1", |_ctx: ContextData<TestContext>| {
    Box::pin(async move { Ok::<_, TestError>(PipelineControl::Stop) })
  });
  pipeline.on_root("step1", create_simple_handler("step1", "NeverRun"));
  pipeline.on_root("step2", create_simple_handler("step2", "NeverRunEither"));

  let ctx = ContextData::new(TestContext::default());
  let result = pipeline.run(ctx.clone()).await;

  assert_eq!(result.unwrap(), PipelineResult::Stopped);
  assert_eq!(ctx.read().counter, 0);
  assert!(ctx.read().steps_executed.is_empty());
}

#[tokio::test]
#[serial]
async fn test_non_optional_step_without_handlers_errors() {
  setup_tracing();
  let pipeline = Pipeline::<TestContext, TestError>::new(&[("lonely_step", false, None)]);

  let ctx = ContextData::new(TestContext::default());
  let result = pipeline.run(ctx).await;

  assert!(result.is_err());
  match result.err().unwrap() {
    TestError::Framework(msg) => assert!(msg.contains("lonely_step"), "unexpected message: {}", msg),
    other => panic!("Expected TestError::Framework, got {:?}", other),
  }
}

#[tokio::test]
#[serial]
async fn test_optional_step_without_handlers_is_skipped() {
  setup_tracing();
  let mut pipeline =
    Pipeline::<TestContext, TestError>::new(&[("step1", false, None), ("maybe_step", true, None), ("step3", false, None)]);

  pipeline.on_root("step1", create_simple_handler("step1", " S1"));
  pipeline.on_root("step3", create_simple_handler("step3", " S3"));

  let ctx = ContextData::new(TestContext::default());
  let result = pipeline.run(ctx.clone()).await;

  assert_eq!(result.unwrap(), PipelineResult::Completed);
  assert_eq!(ctx.read().steps_executed, vec!["step1", "step3"]);
}

// Mirrors ConductorError so the From<anyhow::Error> path gets coverage too.
#[tokio::test]
#[serial]
async fn test_handler_error_from_anyhow_wraps_source() {
  setup_tracing();
  let mut pipeline = Pipeline::<TestContext, ConductorError>::new(&[("step1", false, None)]);

  pipeline.on_root("step1", |_ctx: ContextData<TestContext>| {
    Box::pin(async move {
      Err::<PipelineControl, ConductorError>(anyhow::anyhow!("external failure").into())
    })
  });

  let ctx = ContextData::new(TestContext::default());
  let result = pipeline.run(ctx).await;

  match result {
    Err(ConductorError::HandlerError { source }) => {
      assert_eq!(source.to_string(), "external failure");
    }
    other => panic!("Expected HandlerError, got {:?}", other),
  }
}
