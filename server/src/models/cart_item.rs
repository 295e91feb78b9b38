// server/src/models/cart_item.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

/// One chosen variant attribute, e.g. ("size", "XL"). Kept as an ordered
/// list rather than a map so the selection order survives the round trip
/// into order-item snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantAttribute {
  pub name: String,
  pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CartItem {
  pub id: Uuid,
  pub user_id: Uuid,
  pub product_id: Uuid,
  pub quantity: i32,
  pub variant: Json<Vec<VariantAttribute>>,
  pub added_at: DateTime<Utc>,
}
