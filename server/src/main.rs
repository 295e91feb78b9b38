// server/src/main.rs

mod config;
mod errors;
mod models;
mod pipelines;
mod services;
mod state;
mod web;

use crate::config::AppConfig;
use crate::errors::AppError;
use crate::services::carrier::HttpCarrier;
use crate::services::gateway::HostedGateway;
use crate::services::session::SessionStore;
use crate::state::AppState;

use actix_web::{web as actix_data, App, HttpServer};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
  tracing_subscriber::fmt()
    .with_max_level(Level::INFO)
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env()) // RUST_LOG override
    .with_span_events(FmtSpan::CLOSE)
    .init();

  tracing::info!("Starting storefront server...");

  let app_config = match AppConfig::from_env() {
    Ok(cfg) => Arc::new(cfg),
    Err(e) => {
      tracing::error!(error = %e, "Failed to load application configuration.");
      panic!("Configuration error: {}", e);
    }
  };

  let db_pool = match PgPool::connect(&app_config.database_url).await {
    Ok(pool) => {
      tracing::info!("Successfully connected to the database.");
      pool
    }
    Err(e) => {
      tracing::error!(error = %e, "Failed to connect to the database.");
      panic!("Database connection error: {}", e);
    }
  };

  let carrier = match HttpCarrier::from_config(&app_config) {
    Ok(carrier) => Arc::new(carrier),
    Err(e) => panic!("Carrier client error: {}", e),
  };
  let gateway = match HostedGateway::from_config(&app_config) {
    Ok(gateway) => Arc::new(gateway),
    Err(e) => panic!("Payment gateway client error: {}", e),
  };

  let conductor = Arc::new(conductor::Conductor::<AppError>::new());

  let app_state = AppState {
    db_pool: db_pool.clone(),
    conductor: conductor.clone(),
    config: app_config.clone(),
    sessions: Arc::new(SessionStore::new()),
    carrier,
    gateway,
  };

  pipelines::register_all_pipelines(&conductor, &app_state);
  tracing::info!("Conductor pipelines registered.");

  let server_address = format!("{}:{}", app_config.server_host, app_config.server_port);
  tracing::info!(base_url = %app_config.app_base_url, "Binding server to {}...", server_address);

  HttpServer::new(move || {
    App::new()
      .app_data(actix_data::Data::new(app_state.clone()))
      .wrap(tracing_actix_web::TracingLogger::default())
      .configure(web::configure_app_routes)
  })
  .bind(&server_address)?
  .run()
  .await
}
