// server/src/services/gateway.rs

//! Hosted-payment-page gateway adapter.
//!
//! Two-phase flow: `create_intent` registers the amount with the gateway
//! and returns the handle the client widget needs; the widget later
//! reports back a `(reference, payment_id, signature)` triple that must
//! verify against the shared secret before any order is created.

use crate::config::AppConfig;
use crate::errors::AppError;
use async_trait::async_trait;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::json;
use sha2::Sha256;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, instrument, warn};

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error)]
pub enum GatewayError {
  #[error("Payment gateway is unreachable: {0}")]
  Transport(String),

  #[error("Payment gateway rejected the request: {0}")]
  Api(String),
}

impl From<reqwest::Error> for GatewayError {
  fn from(err: reqwest::Error) -> Self {
    GatewayError::Transport(err.to_string())
  }
}

impl From<GatewayError> for AppError {
  fn from(err: GatewayError) -> Self {
    AppError::Gateway(err.to_string())
  }
}

/// Client-usable handle for a created payment intent.
#[derive(Debug, Clone, serde::Serialize)]
pub struct GatewayIntent {
  pub reference: String,
  pub amount_cents: i64,
  pub currency: String,
  /// Public key id the client widget initializes with.
  pub key_id: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
  async fn create_intent(&self, amount_cents: i64, currency: &str, receipt: &str) -> Result<GatewayIntent, GatewayError>;

  /// Verifies a signed confirmation from the client widget. The
  /// signature is HMAC-SHA256 over `"{reference}|{payment_id}"` keyed
  /// with the shared secret, hex-encoded.
  fn verify_confirmation(&self, reference: &str, payment_id: &str, signature_hex: &str) -> bool;
}

#[derive(Debug, Deserialize)]
struct CreateIntentResponse {
  id: String,
}

pub struct HostedGateway {
  http: reqwest::Client,
  base_url: String,
  key_id: String,
  key_secret: String,
}

impl HostedGateway {
  pub fn from_config(config: &AppConfig) -> Result<Self, AppError> {
    let http = reqwest::Client::builder()
      .timeout(Duration::from_secs(config.http_timeout_secs))
      .build()
      .map_err(|e| AppError::Config(format!("Failed to build gateway HTTP client: {}", e)))?;
    Ok(Self {
      http,
      base_url: config.gateway_base_url.trim_end_matches('/').to_string(),
      key_id: config.gateway_key_id.clone(),
      key_secret: config.gateway_key_secret.clone(),
    })
  }
}

#[async_trait]
impl PaymentGateway for HostedGateway {
  #[instrument(name = "gateway::create_intent", skip(self), fields(amount_cents, currency = %currency))]
  async fn create_intent(&self, amount_cents: i64, currency: &str, receipt: &str) -> Result<GatewayIntent, GatewayError> {
    if amount_cents <= 0 {
      return Err(GatewayError::Api("Amount must be greater than zero.".to_string()));
    }

    let response = self
      .http
      .post(format!("{}/orders", self.base_url))
      .basic_auth(&self.key_id, Some(&self.key_secret))
      .json(&json!({
        "amount": amount_cents,
        "currency": currency,
        "receipt": receipt,
      }))
      .send()
      .await?;

    if !response.status().is_success() {
      let status = response.status();
      let body = response.text().await.unwrap_or_default();
      return Err(GatewayError::Api(format!("status {}: {}", status, body)));
    }

    let created: CreateIntentResponse = response.json().await?;
    info!(reference = %created.id, "Payment intent created with gateway.");
    Ok(GatewayIntent {
      reference: created.id,
      amount_cents,
      currency: currency.to_string(),
      key_id: self.key_id.clone(),
    })
  }

  fn verify_confirmation(&self, reference: &str, payment_id: &str, signature_hex: &str) -> bool {
    let Ok(mut mac) = HmacSha256::new_from_slice(self.key_secret.as_bytes()) else {
      return false;
    };
    mac.update(format!("{}|{}", reference, payment_id).as_bytes());

    let Ok(signature) = hex::decode(signature_hex) else {
      warn!("Payment confirmation carried a non-hex signature.");
      return false;
    };

    // verify_slice is constant-time; a forged or tampered confirmation
    // fails here without leaking where it diverged.
    mac.verify_slice(&signature).is_ok()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn test_gateway(secret: &str) -> HostedGateway {
    HostedGateway {
      http: reqwest::Client::new(),
      base_url: "https://gateway.localhost".to_string(),
      key_id: "key_test".to_string(),
      key_secret: secret.to_string(),
    }
  }

  fn sign(secret: &str, reference: &str, payment_id: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(format!("{}|{}", reference, payment_id).as_bytes());
    hex::encode(mac.finalize().into_bytes())
  }

  #[test]
  fn valid_signature_verifies() {
    let gateway = test_gateway("shhh");
    let signature = sign("shhh", "intent_123", "pay_456");
    assert!(gateway.verify_confirmation("intent_123", "pay_456", &signature));
  }

  #[test]
  fn tampered_signature_is_rejected() {
    let gateway = test_gateway("shhh");
    let mut signature = sign("shhh", "intent_123", "pay_456");
    // Flip the last hex digit.
    let last = signature.pop().unwrap();
    signature.push(if last == '0' { '1' } else { '0' });
    assert!(!gateway.verify_confirmation("intent_123", "pay_456", &signature));
  }

  #[test]
  fn signature_from_wrong_secret_is_rejected() {
    let gateway = test_gateway("shhh");
    let signature = sign("not-the-secret", "intent_123", "pay_456");
    assert!(!gateway.verify_confirmation("intent_123", "pay_456", &signature));
  }

  #[test]
  fn signature_over_different_payment_is_rejected() {
    let gateway = test_gateway("shhh");
    let signature = sign("shhh", "intent_123", "pay_456");
    assert!(!gateway.verify_confirmation("intent_123", "pay_999", &signature));
  }

  #[test]
  fn garbage_signature_is_rejected() {
    let gateway = test_gateway("shhh");
    assert!(!gateway.verify_confirmation("intent_123", "pay_456", "not hex at all"));
  }
}
