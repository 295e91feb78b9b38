// server/src/web/handlers/order_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{instrument, warn};

use crate::errors::AppError;
use crate::services::orders;
use crate::state::AppState;
use crate::web::extractors::SessionAuth;

#[derive(Deserialize, Debug)]
pub struct ConfirmationQuery {
  pub order_number: String,
}

async fn order_response(app_state: &AppState, auth: &SessionAuth, order_number: &str) -> Result<HttpResponse, AppError> {
  let order = orders::find_by_number(&app_state.db_pool, order_number).await?;

  // Treat other customers' order numbers as unknown rather than
  // confirming they exist.
  let Some(order) = order.filter(|o| o.user_id == auth.user_id) else {
    warn!(order_number = %order_number, "Order lookup missed or belonged to another customer.");
    return Err(AppError::NotFound(format!("Order {} not found.", order_number)));
  };

  let items = orders::items_for(&app_state.db_pool, order.id).await?;
  Ok(HttpResponse::Ok().json(json!({
    "order": order,
    "items": items,
  })))
}

/// The post-checkout confirmation target: order data keyed by the order
/// number from the redirect.
#[instrument(name = "handler::order_confirmation", skip_all, fields(order_number = %query.order_number))]
pub async fn order_confirmation_handler(
  app_state: web::Data<AppState>,
  auth: SessionAuth,
  query: web::Query<ConfirmationQuery>,
) -> Result<HttpResponse, AppError> {
  order_response(&app_state, &auth, &query.order_number).await
}

#[instrument(name = "handler::get_order", skip_all, fields(order_number = %path.as_ref()))]
pub async fn get_order_handler(
  app_state: web::Data<AppState>,
  auth: SessionAuth,
  path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
  order_response(&app_state, &auth, &path.into_inner()).await
}
