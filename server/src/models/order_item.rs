// server/src/models/order_item.rs

use crate::models::cart_item::VariantAttribute;
use serde::Serialize;
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

/// An immutable snapshot of one cart line at order-creation time. Name,
/// sku, unit price, and variant are copies; later edits to the referenced
/// product never reach historical orders.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct OrderItem {
  pub id: Uuid,
  pub order_id: Uuid,
  pub product_id: Uuid,
  pub name: String,
  pub sku: String,
  pub quantity: i32,
  pub unit_price_cents: i64,
  pub variant: Json<Vec<VariantAttribute>>,
}
