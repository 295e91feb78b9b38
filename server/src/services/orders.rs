// server/src/services/orders.rs

//! Order persistence: number generation, the transactional create, and
//! lookups for the confirmation/detail pages.

use crate::errors::AppError;
use crate::models::{compute_total, Order, OrderDraft, OrderItem, OrderStatus, PaymentStatus};
use crate::services::discounts;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::{info, instrument, warn};
use uuid::Uuid;

const ORDER_COLUMNS: &str = "id, order_number, user_id, customer_name, customer_email, customer_phone, \
  shipping_address, delivery_type, payment_method, payment_status, status, subtotal_cents, discount_cents, \
  discount_code, shipping_cents, cod_fee_cents, total_cents, currency, created_at, updated_at";

const ORDER_ITEM_COLUMNS: &str = "id, order_id, product_id, name, sku, quantity, unit_price_cents, variant";

/// Human-readable unique order number: date segment plus a random
/// uppercase suffix, e.g. `SO-20260807-9F4C21AB`.
pub fn generate_order_number(now: DateTime<Utc>) -> String {
  let suffix: String = Uuid::new_v4()
    .simple()
    .to_string()
    .chars()
    .take(8)
    .collect::<String>()
    .to_uppercase();
  format!("SO-{}-{}", now.format("%Y%m%d"), suffix)
}

/// Creates the order and its line-item snapshots in one transaction.
///
/// The same transaction redeems the discount (guarded counter increment)
/// and decrements stock with a row-level quantity check, so concurrent
/// checkouts can neither over-redeem a code nor oversell a product: the
/// losing transaction fails here and nothing of it persists.
#[instrument(name = "orders::create_order", skip(pool, draft), fields(user_id = %draft.user_id, lines = draft.lines.len()))]
pub async fn create_order(pool: &PgPool, draft: &OrderDraft) -> Result<(Order, Vec<OrderItem>), AppError> {
  if draft.lines.is_empty() {
    return Err(AppError::Validation("Cannot create an order from an empty cart.".to_string()));
  }

  let now = Utc::now();
  let order_number = generate_order_number(now);
  let total_cents = compute_total(draft.subtotal_cents, draft.discount_cents, draft.shipping_cents, draft.cod_fee_cents);
  // Online orders only reach this point after a verified confirmation.
  let payment_status = if draft.payment_method.is_online() {
    PaymentStatus::Paid
  } else {
    PaymentStatus::Pending
  };

  let mut tx = pool.begin().await?;

  let order: Order = sqlx::query_as(&format!(
    "INSERT INTO orders (id, order_number, user_id, customer_name, customer_email, customer_phone, \
     shipping_address, delivery_type, payment_method, payment_status, status, subtotal_cents, discount_cents, \
     discount_code, shipping_cents, cod_fee_cents, total_cents, currency, created_at, updated_at) \
     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, NOW(), NOW()) \
     RETURNING {ORDER_COLUMNS}"
  ))
  .bind(Uuid::new_v4())
  .bind(&order_number)
  .bind(draft.user_id)
  .bind(&draft.customer_name)
  .bind(&draft.customer_email)
  .bind(&draft.customer_phone)
  .bind(Json(draft.shipping_address.clone()))
  .bind(draft.delivery_type)
  .bind(draft.payment_method)
  .bind(payment_status)
  .bind(OrderStatus::Pending)
  .bind(draft.subtotal_cents)
  .bind(draft.discount_cents)
  .bind(&draft.discount_code)
  .bind(draft.shipping_cents)
  .bind(draft.cod_fee_cents)
  .bind(total_cents)
  .bind(&draft.currency)
  .fetch_one(&mut *tx)
  .await?;

  let mut items = Vec::with_capacity(draft.lines.len());
  for line in &draft.lines {
    let item: OrderItem = sqlx::query_as(&format!(
      "INSERT INTO order_items (id, order_id, product_id, name, sku, quantity, unit_price_cents, variant) \
       VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
       RETURNING {ORDER_ITEM_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(order.id)
    .bind(line.product_id)
    .bind(&line.name)
    .bind(&line.sku)
    .bind(line.quantity)
    .bind(line.unit_price_cents)
    .bind(Json(line.variant.clone()))
    .fetch_one(&mut *tx)
    .await?;
    items.push(item);

    // Guarded decrement: zero rows means a concurrent checkout depleted
    // the stock after our cart-time check.
    let stock_update = sqlx::query(
      "UPDATE products SET stock_quantity = stock_quantity - $1, updated_at = NOW() \
       WHERE id = $2 AND stock_quantity >= $1",
    )
    .bind(line.quantity)
    .bind(line.product_id)
    .execute(&mut *tx)
    .await?;

    if stock_update.rows_affected() == 0 {
      warn!(product_id = %line.product_id, "Stock depleted during order creation.");
      return Err(AppError::Validation(format!(
        "'{}' is no longer available in the requested quantity.",
        line.name
      )));
    }
  }

  if draft.discount_cents > 0 {
    if let Some(code) = &draft.discount_code {
      discounts::redeem(&mut tx, code).await?;
    }
  }

  tx.commit().await?;

  info!(order_number = %order.order_number, total_cents, "Order created.");
  Ok((order, items))
}

pub async fn find_by_number(pool: &PgPool, order_number: &str) -> Result<Option<Order>, AppError> {
  let order: Option<Order> = sqlx::query_as(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE order_number = $1"))
    .bind(order_number)
    .fetch_optional(pool)
    .await?;
  Ok(order)
}

pub async fn items_for(pool: &PgPool, order_id: Uuid) -> Result<Vec<OrderItem>, AppError> {
  let items: Vec<OrderItem> = sqlx::query_as(&format!(
    "SELECT {ORDER_ITEM_COLUMNS} FROM order_items WHERE order_id = $1 ORDER BY name"
  ))
  .bind(order_id)
  .fetch_all(pool)
  .await?;
  Ok(items)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn order_number_carries_date_and_suffix() {
    let now = "2026-08-07T12:00:00Z".parse::<DateTime<Utc>>().unwrap();
    let number = generate_order_number(now);
    assert!(number.starts_with("SO-20260807-"), "unexpected number: {}", number);
    assert_eq!(number.len(), "SO-20260807-".len() + 8);
  }

  #[test]
  fn order_numbers_do_not_repeat_trivially() {
    let now = Utc::now();
    let a = generate_order_number(now);
    let b = generate_order_number(now);
    assert_ne!(a, b);
  }
}
