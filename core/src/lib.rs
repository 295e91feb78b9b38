// src/lib.rs

//! Conductor: an async, type-safe step-pipeline engine.
//!
//! Conductor models a business flow as an ordered list of named steps.
//! Each step carries `before`/`on`/`after` async handlers operating on a
//! shared, lockable context, and every handler returns an explicit
//! `Continue`/`Stop` signal or an error, so a flow short-circuits on the
//! first failure without exceptions-as-control-flow.
//!
//! Features:
//!  - Named steps with before/on/after hooks.
//!  - Asynchronous handlers for I/O-bound operations.
//!  - Per-step skip conditions evaluated against the live context.
//!  - Early stopping via `PipelineControl::Stop`.
//!  - A type-keyed registry (`Conductor`) for dispatching a context to
//!    its pipeline from request handlers.

pub mod core;
pub mod pipeline;
pub mod registry;
pub mod error;

// --- Re-exports for the public API ---

pub use crate::core::control::{PipelineControl, PipelineResult};
pub use crate::core::step::{SkipCondition, StepDef};
pub use crate::core::handler::Handler;
pub use crate::core::context_data::ContextData;

pub use crate::pipeline::definition::Pipeline;

pub use crate::error::{ConductorError, ConductorResult};

pub use crate::registry::Conductor;
