// src/registry.rs

//! The `Conductor<E>` registry: a type-keyed map from context type to
//! pipeline, so request handlers can dispatch a context without naming
//! the pipeline. `E` is the application-level error type returned from
//! `Conductor::run`.

use crate::core::context_data::ContextData;
use crate::core::control::PipelineResult;
use crate::error::ConductorError;
use crate::pipeline::definition::Pipeline as CorePipeline;

use async_trait::async_trait;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::{Arc, Mutex};
use tracing::{event, Level};

/// Type-erased pipeline execution, so pipelines over different context
/// types can live in one registry.
#[async_trait]
trait AnyPipelineRunner<ApplicationError>: Send + Sync
where
  ApplicationError: std::error::Error + Send + Sync + 'static,
{
  /// `ctx_obj` must be a `Box<dyn Any + Send>` holding `ContextData<TData>`.
  async fn run_erased(&self, ctx_obj: Box<dyn Any + Send>) -> Result<PipelineResult, ApplicationError>;
}

struct PipelineWrapper<TData, HandlerError, ApplicationError>
where
  TData: 'static + Send + Sync,
  HandlerError: std::error::Error + From<ConductorError> + Send + Sync + 'static,
  ApplicationError: std::error::Error + From<HandlerError> + From<ConductorError> + Send + Sync + 'static,
{
  pipeline: Arc<CorePipeline<TData, HandlerError>>,
  _phantom_app_err: PhantomData<ApplicationError>,
}

#[async_trait]
impl<TData, HandlerError, ApplicationError> AnyPipelineRunner<ApplicationError>
  for PipelineWrapper<TData, HandlerError, ApplicationError>
where
  TData: 'static + Send + Sync,
  HandlerError: std::error::Error + From<ConductorError> + Send + Sync + 'static,
  ApplicationError: std::error::Error + From<HandlerError> + From<ConductorError> + Send + Sync + 'static,
{
  async fn run_erased(&self, ctx_obj: Box<dyn Any + Send>) -> Result<PipelineResult, ApplicationError> {
    let typed_ctx_data = match ctx_obj.downcast::<ContextData<TData>>() {
      Ok(boxed_ctx_data) => *boxed_ctx_data,
      Err(_) => {
        let expected_type_name = std::any::type_name::<ContextData<TData>>();
        event!(Level::ERROR, "Context object type mismatch. Expected {}.", expected_type_name);
        return Err(ApplicationError::from(ConductorError::TypeMismatch {
          expected_type: expected_type_name.to_string(),
        }));
      }
    };

    self.pipeline.run(typed_ctx_data).await.map_err(ApplicationError::from)
  }
}

/// The registry. Pipelines are keyed by their context data type: one
/// pipeline per `TData`, the latest registration winning.
pub struct Conductor<ApplicationError = ConductorError>
where
  ApplicationError: std::error::Error + From<ConductorError> + Send + Sync + 'static,
{
  registry: Mutex<HashMap<TypeId, Arc<dyn AnyPipelineRunner<ApplicationError>>>>,
}

impl<ApplicationError> Conductor<ApplicationError>
where
  ApplicationError: std::error::Error + From<ConductorError> + Send + Sync + 'static,
{
  /// Creates a new, empty registry.
  pub fn new() -> Self {
    Self {
      registry: Mutex::new(HashMap::new()),
    }
  }

  /// Registers a pipeline under its context type `TData`.
  pub fn register_pipeline<TData, HandlerError>(&self, pipeline: CorePipeline<TData, HandlerError>)
  where
    TData: 'static + Send + Sync,
    HandlerError: std::error::Error + From<ConductorError> + Send + Sync + 'static,
    ApplicationError: From<HandlerError>,
  {
    event!(
      Level::DEBUG,
      context_type = %std::any::type_name::<TData>(),
      "Registering pipeline."
    );
    let wrapper = PipelineWrapper::<TData, HandlerError, ApplicationError> {
      pipeline: Arc::new(pipeline),
      _phantom_app_err: PhantomData,
    };
    self
      .registry
      .lock()
      .expect("conductor registry lock poisoned")
      .insert(TypeId::of::<TData>(), Arc::new(wrapper));
  }

  /// Runs the pipeline registered for `TData` against `ctx_data`.
  pub async fn run<TData>(&self, ctx_data: ContextData<TData>) -> Result<PipelineResult, ApplicationError>
  where
    TData: 'static + Send + Sync,
  {
    let type_id = TypeId::of::<TData>();

    let runner_arc: Arc<dyn AnyPipelineRunner<ApplicationError>> = {
      let reg_lock = self.registry.lock().expect("conductor registry lock poisoned");
      reg_lock.get(&type_id).cloned().ok_or_else(|| {
        let type_name = std::any::type_name::<TData>();
        event!(Level::ERROR, "No pipeline registered for context type {}.", type_name);
        ApplicationError::from(ConductorError::PipelineNotRegistered {
          context_type: type_name.to_string(),
        })
      })?
    };

    let owned_ctx_obj: Box<dyn Any + Send> = Box::new(ctx_data.clone());
    runner_arc.run_erased(owned_ctx_obj).await
  }
}

impl<ApplicationError> Default for Conductor<ApplicationError>
where
  ApplicationError: std::error::Error + From<ConductorError> + Send + Sync + 'static,
{
  fn default() -> Self {
    Self::new()
  }
}
