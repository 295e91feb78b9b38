// core/examples/basic_pipeline.rs

use conductor::{ConductorError, ContextData, Pipeline, PipelineControl};
use tracing::info;

// The context data the pipeline operates on.
#[derive(Clone, Debug, Default)]
struct BasicContext {
  message_log: Vec<String>,
  counter: i32,
}

#[tokio::main]
async fn main() -> Result<(), ConductorError> {
  tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).init();

  info!("--- Basic Pipeline Example ---");

  // Pipeline<TData, Err> where Err must be From<ConductorError>.
  let mut pipeline = Pipeline::<BasicContext, ConductorError>::new(&[
    ("step_alpha", false, None), // (step name, optional, skip_if)
    ("step_beta", false, None),
    ("step_gamma", false, None),
  ]);

  pipeline.on_root("step_alpha", |ctx: ContextData<BasicContext>| {
    Box::pin(async move {
      let mut data = ctx.write();
      data.counter += 1;
      let msg = format!("Alpha executed: counter = {}", data.counter);
      info!("{}", msg);
      data.message_log.push(msg);
      Ok::<_, ConductorError>(PipelineControl::Continue)
    })
  });

  pipeline.on_root("step_beta", |ctx: ContextData<BasicContext>| {
    Box::pin(async move {
      let mut data = ctx.write();
      data.counter *= 2;
      let msg = format!("Beta executed: counter = {}", data.counter);
      info!("{}", msg);
      data.message_log.push(msg);
      Ok::<_, ConductorError>(PipelineControl::Continue)
    })
  });

  pipeline.on_root("step_gamma", |ctx: ContextData<BasicContext>| {
    Box::pin(async move {
      let data = ctx.read();
      info!("Gamma sees {} log lines, counter = {}", data.message_log.len(), data.counter);
      Ok::<_, ConductorError>(PipelineControl::Continue)
    })
  });

  let ctx = ContextData::new(BasicContext::default());
  let outcome = pipeline.run(ctx.clone()).await?;
  info!("Pipeline finished with {:?}; final counter = {}", outcome, ctx.read().counter);

  Ok(())
}
