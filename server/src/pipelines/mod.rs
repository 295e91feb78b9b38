// server/src/pipelines/mod.rs

//! Defines and registers all conductor pipelines used by the storefront.

use crate::errors::AppError;
use crate::state::AppState;
use conductor::Conductor;
use std::sync::Arc;

pub mod common_steps;
pub mod contexts;

pub mod cart_pipeline;
pub mod checkout_pipeline;
pub mod confirm_pipeline;
pub mod intent_pipeline;
pub mod signin_pipeline;
pub mod signup_pipeline;

/// Registers every pipeline with the conductor registry. Called once at
/// startup.
pub fn register_all_pipelines(conductor: &Arc<Conductor<AppError>>, app_state: &AppState) {
  tracing::info!("Registering conductor pipelines...");

  signup_pipeline::register_signup_pipeline(conductor, app_state);
  signin_pipeline::register_signin_pipeline(conductor, app_state);
  cart_pipeline::register_add_to_cart_pipeline(conductor, app_state);
  checkout_pipeline::register_checkout_pipeline(conductor, app_state);
  intent_pipeline::register_payment_intent_pipeline(conductor, app_state);
  confirm_pipeline::register_payment_confirm_pipeline(conductor, app_state);

  tracing::info!("All storefront pipelines registered.");
}
