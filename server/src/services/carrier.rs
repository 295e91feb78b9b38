// server/src/services/carrier.rs

//! Shipping carrier integration: rate estimation for a destination
//! postal code, and shipment creation after an order is placed.
//!
//! Estimation failures abort checkout with the carrier's message;
//! shipment creation is best-effort and its failures are swallowed by
//! the caller.

use crate::config::AppConfig;
use crate::errors::AppError;
use crate::models::{Order, OrderItem, PaymentMethod};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, instrument};

#[derive(Debug, Error)]
pub enum CarrierError {
  /// The destination is outside the carrier's service area. The message
  /// is shown to the customer as-is.
  #[error("{0}")]
  Unserviceable(String),

  #[error("Shipping service is unreachable: {0}")]
  Transport(String),

  #[error("Shipping service rejected the request: {0}")]
  Api(String),
}

impl From<reqwest::Error> for CarrierError {
  fn from(err: reqwest::Error) -> Self {
    CarrierError::Transport(err.to_string())
  }
}

#[derive(Debug, Clone, Serialize)]
pub struct ShippingQuote {
  pub amount_cents: i64,
  pub estimated_days: Option<i32>,
}

#[derive(Debug, Clone)]
pub struct ShipmentRef {
  pub waybill: String,
}

#[async_trait]
pub trait Carrier: Send + Sync {
  /// Prices delivery to `postal_code`. COD shipments are priced
  /// differently by most carriers, so the payment method rides along.
  async fn estimate(&self, postal_code: &str, payment_method: PaymentMethod) -> Result<ShippingQuote, CarrierError>;

  /// Registers a shipment for a created order and returns the waybill.
  async fn create_shipment(&self, order: &Order, items: &[OrderItem]) -> Result<ShipmentRef, CarrierError>;
}

// --- HTTP implementation ---

#[derive(Debug, Deserialize)]
struct RateResponse {
  serviceable: bool,
  amount_cents: Option<i64>,
  estimated_days: Option<i32>,
  message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ShipmentResponse {
  waybill: String,
}

pub struct HttpCarrier {
  http: reqwest::Client,
  base_url: String,
  api_key: String,
}

impl HttpCarrier {
  pub fn from_config(config: &AppConfig) -> Result<Self, AppError> {
    let http = reqwest::Client::builder()
      .timeout(Duration::from_secs(config.http_timeout_secs))
      .build()
      .map_err(|e| AppError::Config(format!("Failed to build carrier HTTP client: {}", e)))?;
    Ok(Self {
      http,
      base_url: config.carrier_base_url.trim_end_matches('/').to_string(),
      api_key: config.carrier_api_key.clone(),
    })
  }
}

#[async_trait]
impl Carrier for HttpCarrier {
  #[instrument(name = "carrier::estimate", skip(self), fields(postal_code = %postal_code))]
  async fn estimate(&self, postal_code: &str, payment_method: PaymentMethod) -> Result<ShippingQuote, CarrierError> {
    let cod_flag = if payment_method == PaymentMethod::CashOnDelivery { "1" } else { "0" };
    let response = self
      .http
      .get(format!("{}/rates", self.base_url))
      .bearer_auth(&self.api_key)
      .query(&[("pincode", postal_code), ("cod", cod_flag)])
      .send()
      .await?;

    if !response.status().is_success() {
      let status = response.status();
      let body = response.text().await.unwrap_or_default();
      return Err(CarrierError::Api(format!("status {}: {}", status, body)));
    }

    let rate: RateResponse = response.json().await?;
    if !rate.serviceable {
      let message = rate
        .message
        .unwrap_or_else(|| "Delivery is not available for this postal code.".to_string());
      return Err(CarrierError::Unserviceable(message));
    }

    let amount_cents = rate
      .amount_cents
      .ok_or_else(|| CarrierError::Api("Rate response missing amount.".to_string()))?;

    info!(amount_cents, "Shipping rate fetched.");
    Ok(ShippingQuote {
      amount_cents,
      estimated_days: rate.estimated_days,
    })
  }

  #[instrument(name = "carrier::create_shipment", skip(self, order, items), fields(order_number = %order.order_number))]
  async fn create_shipment(&self, order: &Order, items: &[OrderItem]) -> Result<ShipmentRef, CarrierError> {
    let address = &order.shipping_address.0;
    let cod_amount_cents = if order.payment_method == PaymentMethod::CashOnDelivery {
      order.total_cents
    } else {
      0
    };

    let payload = json!({
      "order_number": order.order_number,
      "consignee": {
        "name": order.customer_name,
        "phone": order.customer_phone,
        "address": address.line1,
        "city": address.city,
        "state": address.state,
        "zip": address.zip,
        "country": address.country_code,
      },
      "cod_amount_cents": cod_amount_cents,
      "pieces": items.iter().map(|i| json!({"sku": i.sku, "quantity": i.quantity})).collect::<Vec<_>>(),
    });

    let response = self
      .http
      .post(format!("{}/shipments", self.base_url))
      .bearer_auth(&self.api_key)
      .json(&payload)
      .send()
      .await?;

    if !response.status().is_success() {
      let status = response.status();
      let body = response.text().await.unwrap_or_default();
      return Err(CarrierError::Api(format!("status {}: {}", status, body)));
    }

    let shipment: ShipmentResponse = response.json().await?;
    info!(waybill = %shipment.waybill, "Shipment created.");
    Ok(ShipmentRef {
      waybill: shipment.waybill,
    })
  }
}

// --- Test support ---

#[cfg(test)]
pub(crate) mod test_support {
  use super::*;

  /// Carrier stub answering with a fixed quote, or a fixed
  /// serviceability failure when `unserviceable_message` is set.
  pub struct StaticCarrier {
    pub quote_cents: i64,
    pub unserviceable_message: Option<String>,
  }

  #[async_trait]
  impl Carrier for StaticCarrier {
    async fn estimate(&self, _postal_code: &str, _payment_method: PaymentMethod) -> Result<ShippingQuote, CarrierError> {
      match &self.unserviceable_message {
        Some(message) => Err(CarrierError::Unserviceable(message.clone())),
        None => Ok(ShippingQuote {
          amount_cents: self.quote_cents,
          estimated_days: Some(3),
        }),
      }
    }

    async fn create_shipment(&self, _order: &Order, _items: &[OrderItem]) -> Result<ShipmentRef, CarrierError> {
      Ok(ShipmentRef {
        waybill: "TEST-WAYBILL".to_string(),
      })
    }
  }
}
