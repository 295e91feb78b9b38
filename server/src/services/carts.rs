// server/src/services/carts.rs

//! Cart persistence and pricing.
//!
//! Cart rows hold product references and quantities only; prices come
//! from the catalog at pricing time. The checkout flow calls
//! `fetch_priced_cart` once and snapshots the result, so what was priced
//! is exactly what lands on the order.

use crate::errors::AppError;
use crate::models::{CartItem, DraftLine, VariantAttribute};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use tracing::instrument;
use uuid::Uuid;

/// One cart line joined with its live product data.
#[derive(Debug, Clone, serde::Serialize, FromRow)]
pub struct CartLine {
  pub cart_item_id: Uuid,
  pub product_id: Uuid,
  pub name: String,
  pub sku: String,
  pub quantity: i32,
  pub unit_price_cents: i64,
  pub line_total_cents: i64,
  pub variant: Json<Vec<VariantAttribute>>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct PricedCart {
  pub lines: Vec<CartLine>,
  pub subtotal_cents: i64,
}

impl PricedCart {
  pub fn is_empty(&self) -> bool {
    self.lines.is_empty()
  }

  pub fn draft_lines(&self) -> Vec<DraftLine> {
    self
      .lines
      .iter()
      .map(|line| DraftLine {
        product_id: line.product_id,
        name: line.name.clone(),
        sku: line.sku.clone(),
        quantity: line.quantity,
        unit_price_cents: line.unit_price_cents,
        variant: line.variant.0.clone(),
      })
      .collect()
  }
}

pub fn subtotal_cents(lines: &[CartLine]) -> i64 {
  lines.iter().map(|l| l.line_total_cents).sum()
}

#[instrument(name = "carts::fetch_priced_cart", skip(pool), fields(user_id = %user_id))]
pub async fn fetch_priced_cart(pool: &PgPool, user_id: Uuid) -> Result<PricedCart, AppError> {
  let lines: Vec<CartLine> = sqlx::query_as(
    "SELECT ci.id AS cart_item_id, ci.product_id, p.name, p.sku, ci.quantity, \
     p.price_cents AS unit_price_cents, (ci.quantity::bigint * p.price_cents) AS line_total_cents, ci.variant \
     FROM cart_items ci JOIN products p ON p.id = ci.product_id \
     WHERE ci.user_id = $1 ORDER BY ci.added_at",
  )
  .bind(user_id)
  .fetch_all(pool)
  .await?;

  let subtotal_cents = subtotal_cents(&lines);
  Ok(PricedCart { lines, subtotal_cents })
}

pub async fn has_items(pool: &PgPool, user_id: Uuid) -> Result<bool, AppError> {
  let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM cart_items WHERE user_id = $1)")
    .bind(user_id)
    .fetch_one(pool)
    .await?;
  Ok(exists)
}

/// Adds `quantity` of a product/variant to the cart, incrementing the
/// existing line when the same variant selection is already present.
#[instrument(name = "carts::upsert_item", skip(pool, variant), fields(user_id = %user_id, product_id = %product_id, quantity))]
pub async fn upsert_item(
  pool: &PgPool,
  user_id: Uuid,
  product_id: Uuid,
  quantity: i32,
  variant: Vec<VariantAttribute>,
) -> Result<CartItem, AppError> {
  let variant = Json(variant);

  let existing: Option<CartItem> = sqlx::query_as(
    "SELECT id, user_id, product_id, quantity, variant, added_at \
     FROM cart_items WHERE user_id = $1 AND product_id = $2 AND variant = $3",
  )
  .bind(user_id)
  .bind(product_id)
  .bind(&variant)
  .fetch_optional(pool)
  .await?;

  let item: CartItem = match existing {
    Some(existing) => {
      sqlx::query_as(
        "UPDATE cart_items SET quantity = quantity + $1, added_at = NOW() WHERE id = $2 \
         RETURNING id, user_id, product_id, quantity, variant, added_at",
      )
      .bind(quantity)
      .bind(existing.id)
      .fetch_one(pool)
      .await?
    }
    None => {
      sqlx::query_as(
        "INSERT INTO cart_items (id, user_id, product_id, quantity, variant, added_at) \
         VALUES ($1, $2, $3, $4, $5, NOW()) \
         RETURNING id, user_id, product_id, quantity, variant, added_at",
      )
      .bind(Uuid::new_v4())
      .bind(user_id)
      .bind(product_id)
      .bind(quantity)
      .bind(&variant)
      .fetch_one(pool)
      .await?
    }
  };

  Ok(item)
}

pub async fn set_quantity(pool: &PgPool, user_id: Uuid, cart_item_id: Uuid, quantity: i32) -> Result<CartItem, AppError> {
  let updated: Option<CartItem> = sqlx::query_as(
    "UPDATE cart_items SET quantity = $1 WHERE id = $2 AND user_id = $3 \
     RETURNING id, user_id, product_id, quantity, variant, added_at",
  )
  .bind(quantity)
  .bind(cart_item_id)
  .bind(user_id)
  .fetch_optional(pool)
  .await?;

  updated.ok_or_else(|| AppError::NotFound("Cart item not found.".to_string()))
}

pub async fn remove_item(pool: &PgPool, user_id: Uuid, cart_item_id: Uuid) -> Result<(), AppError> {
  let result = sqlx::query("DELETE FROM cart_items WHERE id = $1 AND user_id = $2")
    .bind(cart_item_id)
    .bind(user_id)
    .execute(pool)
    .await?;

  if result.rows_affected() == 0 {
    return Err(AppError::NotFound("Cart item not found.".to_string()));
  }
  Ok(())
}

#[instrument(name = "carts::clear_cart", skip(pool), fields(user_id = %user_id))]
pub async fn clear_cart(pool: &PgPool, user_id: Uuid) -> Result<(), AppError> {
  sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
    .bind(user_id)
    .execute(pool)
    .await?;
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  fn line(quantity: i32, unit_price_cents: i64) -> CartLine {
    CartLine {
      cart_item_id: Uuid::new_v4(),
      product_id: Uuid::new_v4(),
      name: "Test product".to_string(),
      sku: "TST-1".to_string(),
      quantity,
      unit_price_cents,
      line_total_cents: quantity as i64 * unit_price_cents,
      variant: Json(vec![]),
    }
  }

  #[test]
  fn subtotal_sums_line_totals() {
    let lines = vec![line(2, 250_00), line(1, 500_00)];
    assert_eq!(subtotal_cents(&lines), 1000_00);
  }

  #[test]
  fn empty_cart_has_zero_subtotal() {
    assert_eq!(subtotal_cents(&[]), 0);
  }

  #[test]
  fn draft_lines_copy_snapshot_fields() {
    let cart = PricedCart {
      lines: vec![line(3, 100)],
      subtotal_cents: 300,
    };
    let drafts = cart.draft_lines();
    assert_eq!(drafts.len(), 1);
    assert_eq!(drafts[0].quantity, 3);
    assert_eq!(drafts[0].unit_price_cents, 100);
    assert_eq!(drafts[0].name, "Test product");
  }
}
