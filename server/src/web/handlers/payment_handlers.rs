// server/src/web/handlers/payment_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};

use crate::errors::AppError;
use crate::pipelines::contexts::{PaymentConfirmCtxData, PaymentIntentCtxData};
use crate::state::AppState;
use crate::web::extractors::MaybeSession;
use crate::web::forms::CheckoutForm;
use crate::web::handlers::checkout_handlers::{resolve_customer, CustomerSession};
use conductor::{ContextData, PipelineResult};

/// Phase (a): validate the checkout and create a gateway intent. The
/// response is everything the client widget needs to collect payment.
#[instrument(name = "handler::create_payment_intent", skip_all)]
pub async fn create_payment_intent_handler(
  app_state: web::Data<AppState>,
  maybe_session: MaybeSession,
  form: web::Form<CheckoutForm>,
) -> Result<HttpResponse, AppError> {
  let (token, user_id, _csrf) = match resolve_customer(&app_state, &maybe_session, "/checkout") {
    CustomerSession::Authed { token, user_id, csrf_token } => (token, user_id, csrf_token),
    CustomerSession::Redirect(response) => return Ok(response),
  };

  let ctx = ContextData::new(PaymentIntentCtxData::new(
    app_state.get_ref().clone(),
    token,
    user_id,
    form.into_inner(),
  ));

  match app_state.conductor.run(ctx.clone()).await {
    Ok(PipelineResult::Completed) => {
      let intent = {
        let guard = ctx.read();
        guard.intent.clone()
      };
      let intent = intent.ok_or_else(|| {
        warn!("Intent pipeline completed without a gateway intent.");
        AppError::Internal("Payment setup completed, but intent details are unavailable.".to_string())
      })?;

      info!(reference = %intent.reference, "Payment intent issued to client.");
      Ok(HttpResponse::Ok().json(json!({
        "reference": intent.reference,
        "amountCents": intent.amount_cents,
        "currency": intent.currency,
        "keyId": intent.key_id,
      })))
    }
    Ok(PipelineResult::Stopped) => {
      warn!("Payment-intent pipeline was stopped by a handler.");
      Err(AppError::Internal("Payment setup was halted before completion.".to_string()))
    }
    Err(app_err) => Err(app_err),
  }
}

#[derive(Debug, Deserialize)]
pub struct ConfirmPaymentPayload {
  pub reference: String,
  pub gateway_payment_id: String,
  pub signature: String,
}

/// Phase (b): the widget's signed confirmation. Order creation happens
/// only after the signature verifies against the gateway shared secret.
#[instrument(name = "handler::confirm_payment", skip_all, fields(reference = %payload.reference))]
pub async fn confirm_payment_handler(
  app_state: web::Data<AppState>,
  maybe_session: MaybeSession,
  payload: web::Json<ConfirmPaymentPayload>,
) -> Result<HttpResponse, AppError> {
  let payload = payload.into_inner();
  let ctx = ContextData::new(PaymentConfirmCtxData {
    app_state: app_state.get_ref().clone(),
    session_token: maybe_session.token,
    reference: payload.reference,
    gateway_payment_id: payload.gateway_payment_id,
    signature: payload.signature,
    intent: None,
    created_order: None,
    created_items: Vec::new(),
  });

  match app_state.conductor.run(ctx.clone()).await {
    Ok(PipelineResult::Completed) => {
      let order_number = {
        let guard = ctx.read();
        guard.created_order.as_ref().map(|o| o.order_number.clone())
      };
      let order_number = order_number.ok_or_else(|| {
        warn!("Confirmation pipeline completed without a created order.");
        AppError::Internal("Payment confirmed, but order details are unavailable.".to_string())
      })?;

      info!(order_number = %order_number, "Online payment confirmed; order created.");
      Ok(HttpResponse::Ok().json(json!({
        "message": "Payment confirmed.",
        "orderNumber": order_number,
        "redirectTo": format!("/orders/confirmation?order_number={}", order_number),
      })))
    }
    Ok(PipelineResult::Stopped) => {
      warn!("Confirmation pipeline was stopped by a handler.");
      Err(AppError::Internal("Payment confirmation was halted before completion.".to_string()))
    }
    Err(app_err) => Err(app_err),
  }
}
