// server/src/config.rs

use crate::errors::{AppError, Result};
use dotenvy::dotenv;
use std::env;

#[derive(Debug, Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,
  pub database_url: String,
  pub app_base_url: String,

  /// Currency code stamped onto orders and payment intents.
  pub currency: String,
  /// Flat surcharge for cash-on-delivery orders, in cents.
  pub cod_fee_cents: i64,
  /// Minimum gap between checkout submissions from one session.
  pub checkout_throttle_secs: i64,
  /// Timeout applied to carrier and gateway HTTP calls.
  pub http_timeout_secs: u64,

  // Shipping carrier API
  pub carrier_base_url: String,
  pub carrier_api_key: String,

  // Hosted payment gateway
  pub gateway_base_url: String,
  pub gateway_key_id: String,
  pub gateway_key_secret: String,
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok(); // Load .env file if present

    let get_env = |var_name: &str| {
      env::var(var_name).map_err(|e| AppError::Config(format!("Missing environment variable '{}': {}", var_name, e)))
    };

    let server_host = get_env("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let server_port = get_env("SERVER_PORT")
      .unwrap_or_else(|_| "8080".to_string())
      .parse::<u16>()
      .map_err(|e| AppError::Config(format!("Invalid SERVER_PORT: {}", e)))?;
    let database_url = get_env("DATABASE_URL")?;
    let app_base_url = get_env("APP_BASE_URL").unwrap_or_else(|_| format!("http://{}:{}", server_host, server_port));

    let currency = get_env("STORE_CURRENCY").unwrap_or_else(|_| "INR".to_string());
    let cod_fee_cents = get_env("COD_FEE_CENTS")
      .unwrap_or_else(|_| "2000".to_string())
      .parse::<i64>()
      .map_err(|e| AppError::Config(format!("Invalid COD_FEE_CENTS: {}", e)))?;
    let checkout_throttle_secs = get_env("CHECKOUT_THROTTLE_SECS")
      .unwrap_or_else(|_| "5".to_string())
      .parse::<i64>()
      .map_err(|e| AppError::Config(format!("Invalid CHECKOUT_THROTTLE_SECS: {}", e)))?;
    let http_timeout_secs = get_env("HTTP_TIMEOUT_SECS")
      .unwrap_or_else(|_| "10".to_string())
      .parse::<u64>()
      .map_err(|e| AppError::Config(format!("Invalid HTTP_TIMEOUT_SECS: {}", e)))?;

    let carrier_base_url = get_env("CARRIER_BASE_URL").unwrap_or_else(|_| "https://carrier.localhost".to_string());
    let carrier_api_key = get_env("CARRIER_API_KEY").unwrap_or_else(|_| "dev_carrier_key".to_string());

    let gateway_base_url = get_env("GATEWAY_BASE_URL").unwrap_or_else(|_| "https://gateway.localhost".to_string());
    let gateway_key_id = get_env("GATEWAY_KEY_ID").unwrap_or_else(|_| "dev_key_id".to_string());
    let gateway_key_secret = get_env("GATEWAY_KEY_SECRET").unwrap_or_else(|_| "dev_key_secret".to_string());

    tracing::info!("Application configuration loaded successfully.");

    Ok(Self {
      server_host,
      server_port,
      database_url,
      app_base_url,
      currency,
      cod_fee_cents,
      checkout_throttle_secs,
      http_timeout_secs,
      carrier_base_url,
      carrier_api_key,
      gateway_base_url,
      gateway_key_id,
      gateway_key_secret,
    })
  }
}
