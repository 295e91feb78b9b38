// server/src/pipelines/common_steps.rs

//! Logic shared between the direct (COD) checkout pipeline and the
//! online payment pipelines. Each function does one policy check and is
//! wrapped by thin step handlers in the pipeline modules.

use crate::errors::AppError;
use crate::models::{DeliveryType, Order, OrderItem};
use crate::services::discounts;
use crate::state::AppState;
use crate::web::forms::CheckoutForm;
use chrono::{DateTime, Utc};
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Session-local resubmit throttle. Records this attempt and rejects it
/// when the previous one is closer than the configured window.
#[instrument(name = "checkout::enforce_submit_throttle", skip_all)]
pub fn enforce_submit_throttle(
  state: &AppState,
  session_token: &str,
  submitted_at: DateTime<Utc>,
) -> Result<(), AppError> {
  let window = state.config.checkout_throttle_secs;
  if let Some(previous) = state.sessions.record_checkout_attempt(session_token, submitted_at) {
    let elapsed = (submitted_at - previous).num_seconds();
    if elapsed < window {
      warn!(elapsed, "Checkout resubmitted inside the throttle window.");
      return Err(AppError::RateLimited {
        retry_after_secs: window - elapsed,
      });
    }
  }
  Ok(())
}

/// The hidden field legitimate browsers never fill. Anything in it marks
/// the submission as automated.
pub fn check_honeypot(form: &CheckoutForm) -> Result<(), AppError> {
  if !form.hp_website_check.trim().is_empty() {
    warn!("Honeypot field was filled; rejecting submission.");
    return Err(AppError::Security);
  }
  Ok(())
}

/// The submitted token must equal the one minted into the session when
/// the form was rendered.
pub fn verify_csrf_token(state: &AppState, session_token: &str, form: &CheckoutForm) -> Result<(), AppError> {
  let Some(session) = state.sessions.get(session_token) else {
    warn!("Checkout submitted without a live session.");
    return Err(AppError::Security);
  };
  if session.csrf_token != form.csrf_token {
    warn!("CSRF token mismatch on checkout submission.");
    return Err(AppError::Security);
  }
  Ok(())
}

/// Resolves the discount for this submission against the current cart
/// total.
///
/// A code submitted explicitly this request fails loudly with the rule
/// violation; a code merely carried over in the session is cleared and
/// the checkout proceeds undiscounted.
#[instrument(name = "checkout::resolve_discount", skip_all, fields(customer_id = %customer_id, subtotal_cents))]
pub async fn resolve_discount(
  state: &AppState,
  session_token: &str,
  form: &CheckoutForm,
  subtotal_cents: i64,
  customer_id: Uuid,
) -> Result<(i64, Option<String>), AppError> {
  let submitted = form.submitted_discount_code();
  let explicit = submitted.is_some();
  let code = match submitted {
    Some(code) => Some(code),
    None => state.sessions.get(session_token).and_then(|s| s.pending_discount_code),
  };
  let Some(code) = code else {
    return Ok((0, None));
  };

  match discounts::calculate_amount(&state.db_pool, &code, subtotal_cents, customer_id).await {
    Ok(amount) => {
      state.sessions.set_pending_discount(session_token, Some(code.clone()));
      Ok((amount, Some(code)))
    }
    Err(AppError::Discount(rule_err)) => {
      if explicit {
        return Err(AppError::Discount(rule_err));
      }
      info!(code = %code, reason = %rule_err, "Dropping stale session discount code.");
      state.sessions.set_pending_discount(session_token, None);
      Ok((0, None))
    }
    Err(other) => Err(other),
  }
}

/// Prices delivery to the destination postal code. Pickup orders never
/// reach this; the step is skipped for them.
#[instrument(name = "checkout::estimate_shipping_cost", skip_all, fields(zip = %form.zip))]
pub async fn estimate_shipping_cost(state: &AppState, form: &CheckoutForm) -> Result<i64, AppError> {
  if form.zip.trim().is_empty() {
    return Err(AppError::Validation("Please provide a delivery postal code.".to_string()));
  }
  let quote = state
    .carrier
    .estimate(form.zip.trim(), form.payment_method)
    .await
    .map_err(|e| AppError::Shipping(e.to_string()))?;
  info!(amount_cents = quote.amount_cents, estimated_days = ?quote.estimated_days, "Shipping quoted.");
  Ok(quote.amount_cents)
}

/// Best-effort courier registration after the order is durably created.
/// Failure is logged and swallowed; the order stands either way.
#[instrument(name = "checkout::dispatch_shipment", skip_all, fields(order_number = %order.order_number))]
pub async fn dispatch_shipment(state: &AppState, order: &Order, items: &[OrderItem]) {
  if order.delivery_type != DeliveryType::Delivery {
    return;
  }
  match state.carrier.create_shipment(order, items).await {
    Ok(shipment) => {
      info!(waybill = %shipment.waybill, "Courier shipment registered.");
    }
    Err(e) => {
      warn!(error = %e, "Courier shipment creation failed; order is unaffected.");
    }
  }
}
