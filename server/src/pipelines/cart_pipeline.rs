// server/src/pipelines/cart_pipeline.rs

use crate::errors::AppError;
use crate::models::Product;
use crate::pipelines::contexts::AddToCartCtxData;
use crate::services::carts;
use crate::state::AppState;
use conductor::{Conductor, ContextData, Pipeline, PipelineControl};
use std::sync::Arc;
use tracing::{info, warn};

pub fn register_add_to_cart_pipeline(conductor: &Arc<Conductor<AppError>>, _app_state: &AppState) {
  let mut p = Pipeline::<AddToCartCtxData, AppError>::new(&[
    ("validate_cart_input", false, None),
    ("fetch_product_for_cart", false, None),
    ("check_product_stock_for_cart", false, None),
    ("add_or_update_cart_item_db", false, None),
  ]);

  // Step 1: the only client-supplied number.
  p.on_root("validate_cart_input", |ctx: ContextData<AddToCartCtxData>| {
    Box::pin(async move {
      let quantity = { ctx.read().quantity };
      if quantity <= 0 {
        warn!(quantity, "Invalid add-to-cart quantity.");
        return Err(AppError::Validation("Quantity must be a positive number.".to_string()));
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  // Step 2: the product must exist; its current stock rides along for
  // the next step.
  p.on_root("fetch_product_for_cart", |ctx: ContextData<AddToCartCtxData>| {
    Box::pin(async move {
      let (product_id, pool) = {
        let guard = ctx.read();
        (guard.product_id, guard.app_state.db_pool.clone())
      };

      let product: Option<Product> = sqlx::query_as(
        "SELECT id, name, sku, description, price_cents, stock_quantity, created_at, updated_at \
         FROM products WHERE id = $1",
      )
      .bind(product_id)
      .fetch_optional(&pool)
      .await?;

      let Some(product) = product else {
        warn!(%product_id, "Add-to-cart for unknown product.");
        return Err(AppError::NotFound(format!("Product with ID {} not found.", product_id)));
      };

      {
        ctx.write().fetched_product = Some(product);
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  // Step 3: stock is checked here and decremented only when an order is
  // created, so this is advisory rather than a reservation.
  p.on_root("check_product_stock_for_cart", |ctx: ContextData<AddToCartCtxData>| {
    Box::pin(async move {
      let (requested, product) = {
        let guard = ctx.read();
        (guard.quantity, guard.fetched_product.clone())
      };
      let Some(product) = product else {
        return Err(AppError::Internal("Product missing before stock check.".to_string()));
      };

      if product.stock_quantity < requested {
        warn!(
          product_id = %product.id,
          available = product.stock_quantity,
          requested,
          "Insufficient stock for add-to-cart."
        );
        return Err(AppError::Validation(format!(
          "Insufficient stock. Only {} available.",
          product.stock_quantity
        )));
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  // Step 4: upsert the line; same product + same variant increments.
  p.on_root("add_or_update_cart_item_db", |ctx: ContextData<AddToCartCtxData>| {
    Box::pin(async move {
      let (pool, user_id, product_id, quantity, variant) = {
        let guard = ctx.read();
        (
          guard.app_state.db_pool.clone(),
          guard.user_id,
          guard.product_id,
          guard.quantity,
          guard.variant.clone(),
        )
      };

      let item = carts::upsert_item(&pool, user_id, product_id, quantity, variant).await?;
      info!(cart_item_id = %item.id, new_quantity = item.quantity, "Cart line added or updated.");
      {
        ctx.write().updated_cart_item = Some(item);
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  conductor.register_pipeline(p);
  info!("Add-to-cart pipeline registered.");
}
