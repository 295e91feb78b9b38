// server/src/web/handlers/product_handlers.rs

use actix_web::{web, HttpResponse};
use serde_json::json;
use tracing::{instrument, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::Product;
use crate::state::AppState;

const PRODUCT_COLUMNS: &str = "id, name, sku, description, price_cents, stock_quantity, created_at, updated_at";

#[instrument(name = "handler::list_products", skip_all)]
pub async fn list_products_handler(app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
  let products: Vec<Product> =
    sqlx::query_as(&format!("SELECT {PRODUCT_COLUMNS} FROM products ORDER BY created_at DESC"))
      .fetch_all(&app_state.db_pool)
      .await?;

  Ok(HttpResponse::Ok().json(json!({
    "products": products,
    "count": products.len(),
  })))
}

#[instrument(name = "handler::get_product", skip_all, fields(product_id = %path.as_ref()))]
pub async fn get_product_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let product_id = path.into_inner();

  let product: Option<Product> = sqlx::query_as(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"))
    .bind(product_id)
    .fetch_optional(&app_state.db_pool)
    .await?;

  match product {
    Some(product) => Ok(HttpResponse::Ok().json(json!({"product": product}))),
    None => {
      warn!("Product {} not found.", product_id);
      Err(AppError::NotFound(format!("Product with ID {} not found.", product_id)))
    }
  }
}
