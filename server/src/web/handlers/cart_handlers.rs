// server/src/web/handlers/cart_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::VariantAttribute;
use crate::pipelines::contexts::AddToCartCtxData;
use crate::services::{carts, discounts};
use crate::state::AppState;
use crate::web::extractors::SessionAuth;
use conductor::{ContextData, PipelineResult};

// --- Request DTOs ---

#[derive(Deserialize, Debug)]
pub struct AddToCartRequestPayload {
  pub product_id: Uuid,
  pub quantity: i32,
  #[serde(default)]
  pub variant: Vec<VariantAttribute>,
}

#[derive(Deserialize, Debug)]
pub struct UpdateCartItemPayload {
  pub cart_item_id: Uuid,
  pub quantity: i32,
}

#[derive(Deserialize, Debug)]
pub struct RemoveCartItemPayload {
  pub cart_item_id: Uuid,
}

#[derive(Deserialize, Debug)]
pub struct ApplyDiscountPayload {
  pub code: String,
}

// --- Handlers ---

#[instrument(name = "handler::view_cart", skip_all, fields(user_id = %auth.user_id))]
pub async fn view_cart_handler(app_state: web::Data<AppState>, auth: SessionAuth) -> Result<HttpResponse, AppError> {
  let cart = carts::fetch_priced_cart(&app_state.db_pool, auth.user_id).await?;
  Ok(HttpResponse::Ok().json(json!({
    "items": cart.lines,
    "subtotalCents": cart.subtotal_cents,
    "currency": app_state.config.currency,
    "pendingDiscountCode": auth.session.pending_discount_code,
  })))
}

#[instrument(
    name = "handler::add_to_cart",
    skip_all,
    fields(user_id = %auth.user_id, product_id = %req_payload.product_id, quantity = %req_payload.quantity)
)]
pub async fn add_to_cart_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<AddToCartRequestPayload>,
  auth: SessionAuth,
) -> Result<HttpResponse, AppError> {
  let payload = req_payload.into_inner();
  let ctx = ContextData::new(AddToCartCtxData {
    app_state: app_state.get_ref().clone(),
    user_id: auth.user_id,
    product_id: payload.product_id,
    quantity: payload.quantity,
    variant: payload.variant,
    fetched_product: None,
    updated_cart_item: None,
  });

  match app_state.conductor.run(ctx.clone()).await {
    Ok(PipelineResult::Completed) => {
      let updated_item = {
        let guard = ctx.read();
        guard.updated_cart_item.clone()
      };
      let updated_item = updated_item.ok_or_else(|| {
        warn!("Add-to-cart pipeline completed but no cart item was recorded.");
        AppError::Internal("Cart update completed, but item details are unavailable.".to_string())
      })?;

      info!(cart_item_id = %updated_item.id, "Item added to cart.");
      Ok(HttpResponse::Ok().json(json!({
        "message": "Item added to cart successfully.",
        "cartItem": updated_item,
      })))
    }
    Ok(PipelineResult::Stopped) => {
      warn!("Add-to-cart pipeline was stopped by a handler.");
      Err(AppError::Internal("Adding the item to the cart was halted.".to_string()))
    }
    Err(app_err) => Err(app_err),
  }
}

#[instrument(name = "handler::update_cart_item", skip_all, fields(user_id = %auth.user_id))]
pub async fn update_cart_item_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<UpdateCartItemPayload>,
  auth: SessionAuth,
) -> Result<HttpResponse, AppError> {
  if req_payload.quantity <= 0 {
    return Err(AppError::Validation("Quantity must be a positive number.".to_string()));
  }
  let item = carts::set_quantity(&app_state.db_pool, auth.user_id, req_payload.cart_item_id, req_payload.quantity).await?;
  Ok(HttpResponse::Ok().json(json!({"message": "Cart updated.", "cartItem": item})))
}

#[instrument(name = "handler::remove_cart_item", skip_all, fields(user_id = %auth.user_id))]
pub async fn remove_cart_item_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<RemoveCartItemPayload>,
  auth: SessionAuth,
) -> Result<HttpResponse, AppError> {
  carts::remove_item(&app_state.db_pool, auth.user_id, req_payload.cart_item_id).await?;
  Ok(HttpResponse::Ok().json(json!({"message": "Item removed from cart."})))
}

/// Explicit coupon application from the cart page. Validation failures
/// surface the specific rule error; success stores the code in the
/// session so checkout picks it up.
#[instrument(name = "handler::apply_discount", skip_all, fields(user_id = %auth.user_id))]
pub async fn apply_discount_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<ApplyDiscountPayload>,
  auth: SessionAuth,
) -> Result<HttpResponse, AppError> {
  let code = req_payload.code.trim().to_string();
  if code.is_empty() {
    return Err(AppError::Validation("Please enter a discount code.".to_string()));
  }

  let cart = carts::fetch_priced_cart(&app_state.db_pool, auth.user_id).await?;
  if cart.is_empty() {
    return Err(AppError::Validation("Your cart is empty.".to_string()));
  }

  let amount = discounts::calculate_amount(&app_state.db_pool, &code, cart.subtotal_cents, auth.user_id).await?;
  app_state.sessions.set_pending_discount(&auth.token, Some(code.clone()));

  info!(code = %code, discount_cents = amount, "Discount code applied to session.");
  Ok(HttpResponse::Ok().json(json!({
    "message": "Discount applied.",
    "code": code,
    "discountCents": amount,
    "subtotalCents": cart.subtotal_cents,
  })))
}
