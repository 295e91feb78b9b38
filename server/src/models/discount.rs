// server/src/models/discount.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type as SqlxType};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "discount_kind_enum", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DiscountKind {
  /// `value` is a percentage of the cart total (0..=100).
  Percentage,
  /// `value` is a fixed deduction in cents.
  Fixed,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Discount {
  pub id: Uuid,
  pub code: String,
  pub kind: DiscountKind,
  /// Percent for `Percentage`, cents for `Fixed`.
  pub value: i64,
  pub min_purchase_cents: i64,
  /// Optional ceiling for percentage discounts, in cents.
  pub max_discount_cents: Option<i64>,
  pub usage_limit: Option<i32>,
  pub used_count: i32,
  pub valid_from: Option<DateTime<Utc>>,
  pub valid_until: Option<DateTime<Utc>>,
  pub active: bool,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}
