// server/src/state.rs

use crate::config::AppConfig;
use crate::errors::AppError;
use crate::services::carrier::Carrier;
use crate::services::gateway::PaymentGateway;
use crate::services::session::SessionStore;
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
  pub db_pool: PgPool,
  pub conductor: Arc<conductor::Conductor<AppError>>,
  pub config: Arc<AppConfig>,
  pub sessions: Arc<SessionStore>,
  pub carrier: Arc<dyn Carrier>,
  pub gateway: Arc<dyn PaymentGateway>,
}
