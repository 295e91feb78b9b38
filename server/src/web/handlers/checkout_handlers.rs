// server/src/web/handlers/checkout_handlers.rs

use actix_web::cookie::Cookie;
use actix_web::http::header;
use actix_web::{web, HttpResponse};
use serde_json::json;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::pipelines::contexts::CheckoutCtxData;
use crate::services::carts;
use crate::state::AppState;
use crate::web::extractors::{MaybeSession, SESSION_COOKIE};
use crate::web::forms::CheckoutForm;
use conductor::{ContextData, PipelineResult};

pub fn redirect_to(path: &str) -> HttpResponse {
  HttpResponse::SeeOther()
    .insert_header((header::LOCATION, path.to_string()))
    .finish()
}

/// Resolution of a checkout request's session: either a signed-in
/// customer, or the redirect that sends them to sign in (minting an
/// anonymous session so the CSRF token and return target survive the
/// hop).
pub enum CustomerSession {
  Authed { token: String, user_id: Uuid, csrf_token: String },
  Redirect(HttpResponse),
}

pub fn resolve_customer(state: &AppState, maybe: &MaybeSession, return_target: &str) -> CustomerSession {
  if let Some(token) = &maybe.token {
    if let Some(session) = state.sessions.get(token) {
      if let Some(user_id) = session.user_id {
        return CustomerSession::Authed {
          token: token.clone(),
          user_id,
          csrf_token: session.csrf_token,
        };
      }
      state.sessions.set_return_to(token, Some(return_target.to_string()));
      return CustomerSession::Redirect(redirect_to("/login"));
    }
  }

  let (token, _session) = state.sessions.create_anonymous();
  state.sessions.set_return_to(&token, Some(return_target.to_string()));
  let cookie = Cookie::build(SESSION_COOKIE, token).path("/").http_only(true).finish();
  CustomerSession::Redirect(
    HttpResponse::SeeOther()
      .cookie(cookie)
      .insert_header((header::LOCATION, "/login"))
      .finish(),
  )
}

/// Checkout bootstrap: hands the page its CSRF token and a totals
/// preview. Empty carts bounce back to the cart page.
#[instrument(name = "handler::get_checkout", skip_all)]
pub async fn get_checkout_handler(
  app_state: web::Data<AppState>,
  maybe_session: MaybeSession,
) -> Result<HttpResponse, AppError> {
  let (_token, user_id, csrf_token) = match resolve_customer(&app_state, &maybe_session, "/checkout") {
    CustomerSession::Authed { token, user_id, csrf_token } => (token, user_id, csrf_token),
    CustomerSession::Redirect(response) => return Ok(response),
  };

  let cart = carts::fetch_priced_cart(&app_state.db_pool, user_id).await?;
  if cart.is_empty() {
    return Ok(redirect_to("/cart"));
  }

  Ok(HttpResponse::Ok().json(json!({
    "csrfToken": csrf_token,
    "subtotalCents": cart.subtotal_cents,
    "currency": app_state.config.currency,
    "codFeeCents": app_state.config.cod_fee_cents,
  })))
}

/// The checkout form POST. Runs the full checkout pipeline; on success
/// the cart is gone and the customer lands on the confirmation page for
/// the new order number.
#[instrument(name = "handler::post_checkout", skip_all)]
pub async fn post_checkout_handler(
  app_state: web::Data<AppState>,
  maybe_session: MaybeSession,
  form: web::Form<CheckoutForm>,
) -> Result<HttpResponse, AppError> {
  let (token, user_id, _csrf) = match resolve_customer(&app_state, &maybe_session, "/checkout") {
    CustomerSession::Authed { token, user_id, csrf_token } => (token, user_id, csrf_token),
    CustomerSession::Redirect(response) => return Ok(response),
  };

  if form.place_order.as_deref() != Some("1") {
    return Err(AppError::Validation("Invalid checkout submission.".to_string()));
  }

  if !carts::has_items(&app_state.db_pool, user_id).await? {
    info!("Checkout POST with an empty cart; redirecting to cart page.");
    return Ok(redirect_to("/cart"));
  }

  let ctx = ContextData::new(CheckoutCtxData::new(
    app_state.get_ref().clone(),
    token,
    user_id,
    form.into_inner(),
  ));

  match app_state.conductor.run(ctx.clone()).await {
    Ok(PipelineResult::Completed) => {
      let order_number = {
        let guard = ctx.read();
        guard.created_order.as_ref().map(|o| o.order_number.clone())
      };
      let order_number = order_number.ok_or_else(|| {
        warn!("Checkout pipeline completed without a created order.");
        AppError::Internal("Checkout completed, but order details are unavailable.".to_string())
      })?;

      info!(order_number = %order_number, "Checkout completed.");
      Ok(redirect_to(&format!("/orders/confirmation?order_number={}", order_number)))
    }
    Ok(PipelineResult::Stopped) => {
      warn!("Checkout pipeline was stopped by a handler.");
      Err(AppError::Internal("Checkout was halted before completion.".to_string()))
    }
    Err(app_err) => Err(app_err),
  }
}
