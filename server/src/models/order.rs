// server/src/models/order.rs

use crate::models::cart_item::VariantAttribute;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::{FromRow, Type as SqlxType};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "payment_method_enum", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
  CashOnDelivery,
  CreditCard,
  Razorpay,
}

impl PaymentMethod {
  /// Online methods are finalized through the verified-confirmation path,
  /// never through a direct form POST.
  pub fn is_online(self) -> bool {
    matches!(self, PaymentMethod::CreditCard | PaymentMethod::Razorpay)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "delivery_type_enum", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DeliveryType {
  Delivery,
  Pickup,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "payment_status_enum", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
  Pending,
  Paid,
  Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "order_status_enum", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
  Pending,
  Confirmed,
  Shipped,
  Delivered,
  Cancelled,
}

/// Structured shipping address, persisted on the order as JSONB.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
  pub line1: String,
  pub city: String,
  pub state: String,
  pub zip: String,
  pub country_code: String,
  pub country: String,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Order {
  pub id: Uuid,
  pub order_number: String,
  pub user_id: Uuid,
  pub customer_name: String,
  pub customer_email: String,
  pub customer_phone: String,
  pub shipping_address: Json<Address>,
  pub delivery_type: DeliveryType,
  pub payment_method: PaymentMethod,
  pub payment_status: PaymentStatus,
  pub status: OrderStatus,
  pub subtotal_cents: i64,
  pub discount_cents: i64,
  pub discount_code: Option<String>,
  pub shipping_cents: i64,
  pub cod_fee_cents: i64,
  pub total_cents: i64,
  pub currency: String,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// One priced cart line frozen for order creation: product name, sku,
/// unit price, and variant are copied, not referenced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftLine {
  pub product_id: Uuid,
  pub name: String,
  pub sku: String,
  pub quantity: i32,
  pub unit_price_cents: i64,
  pub variant: Vec<VariantAttribute>,
}

/// Everything needed to durably create an order, assembled by the
/// checkout flow (or stored on a payment intent between the two phases of
/// online confirmation).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderDraft {
  pub user_id: Uuid,
  pub customer_name: String,
  pub customer_email: String,
  pub customer_phone: String,
  pub shipping_address: Address,
  pub delivery_type: DeliveryType,
  pub payment_method: PaymentMethod,
  pub lines: Vec<DraftLine>,
  pub subtotal_cents: i64,
  pub discount_cents: i64,
  pub discount_code: Option<String>,
  pub shipping_cents: i64,
  pub cod_fee_cents: i64,
  pub currency: String,
}

impl OrderDraft {
  pub fn total_cents(&self) -> i64 {
    compute_total(self.subtotal_cents, self.discount_cents, self.shipping_cents, self.cod_fee_cents)
  }
}

/// `total = subtotal - discount + shipping + cod_fee`; tax is 0. The
/// discounted subtotal is clamped at zero so an over-large fixed deduction
/// can never produce a negative total.
pub fn compute_total(subtotal_cents: i64, discount_cents: i64, shipping_cents: i64, cod_fee_cents: i64) -> i64 {
  (subtotal_cents - discount_cents).max(0) + shipping_cents + cod_fee_cents
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn total_is_subtotal_minus_discount_plus_shipping_and_cod_fee() {
    // Cart total 1000, 10% discount, shipping 50, COD surcharge 20 -> 970.
    assert_eq!(compute_total(1000_00, 100_00, 50_00, 20_00), 970_00);
  }

  #[test]
  fn total_without_adjustments_is_subtotal() {
    assert_eq!(compute_total(2499, 0, 0, 0), 2499);
  }

  #[test]
  fn oversized_fixed_discount_never_drives_total_negative() {
    assert_eq!(compute_total(500, 900, 50, 0), 50);
  }

  #[test]
  fn online_methods_are_flagged_online() {
    assert!(PaymentMethod::CreditCard.is_online());
    assert!(PaymentMethod::Razorpay.is_online());
    assert!(!PaymentMethod::CashOnDelivery.is_online());
  }
}
