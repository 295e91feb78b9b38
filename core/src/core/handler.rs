// src/core/handler.rs

//! The boxed async handler type stored against each step phase.

use super::context_data::ContextData;
use super::control::PipelineControl;
use std::future::Future;
use std::pin::Pin;

/// A step handler: takes the shared context, returns a boxed future
/// resolving to a flow-control signal or the pipeline's error type.
pub type Handler<TData, Err> = Box<
  dyn Fn(ContextData<TData>) -> Pin<Box<dyn Future<Output = Result<PipelineControl, Err>> + Send>>
    + Send
    + Sync,
>;
