// server/src/pipelines/intent_pipeline.rs

//! Phase (a) of online payment: validate the checkout exactly like the
//! direct flow, then create a gateway payment-intent for the computed
//! total and snapshot the validated payload onto a `payment_intents`
//! row. No order exists until phase (b) verifies the confirmation.

use crate::errors::AppError;
use crate::models::{compute_total, DeliveryType, OrderDraft, PaymentIntentStatus};
use crate::pipelines::common_steps;
use crate::pipelines::contexts::PaymentIntentCtxData;
use crate::services::carts;
use crate::state::AppState;
use conductor::{Conductor, ContextData, Pipeline, PipelineControl};
use sqlx::types::Json;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

pub fn register_payment_intent_pipeline(conductor: &Arc<Conductor<AppError>>, _app_state: &AppState) {
  let mut p = Pipeline::<PaymentIntentCtxData, AppError>::new(&[
    ("enforce_submit_throttle", false, None),
    ("check_honeypot", false, None),
    ("verify_csrf_token", false, None),
    ("validate_contact_fields", false, None),
    ("require_online_method", false, None),
    ("price_cart", false, None),
    ("apply_discount", false, None),
    (
      "estimate_shipping",
      false,
      Some(Arc::new(|ctx: ContextData<PaymentIntentCtxData>| {
        ctx.read().form.delivery_type == DeliveryType::Pickup
      })),
    ),
    ("create_gateway_intent", false, None),
  ]);

  p.on_root("enforce_submit_throttle", |ctx: ContextData<PaymentIntentCtxData>| {
    Box::pin(async move {
      let (state, token, submitted_at) = {
        let guard = ctx.read();
        (guard.app_state.clone(), guard.session_token.clone(), guard.submitted_at)
      };
      common_steps::enforce_submit_throttle(&state, &token, submitted_at)?;
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("check_honeypot", |ctx: ContextData<PaymentIntentCtxData>| {
    Box::pin(async move {
      {
        let guard = ctx.read();
        common_steps::check_honeypot(&guard.form)?;
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("verify_csrf_token", |ctx: ContextData<PaymentIntentCtxData>| {
    Box::pin(async move {
      {
        let guard = ctx.read();
        common_steps::verify_csrf_token(&guard.app_state, &guard.session_token, &guard.form)?;
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("validate_contact_fields", |ctx: ContextData<PaymentIntentCtxData>| {
    Box::pin(async move {
      let (contact, address) = {
        let guard = ctx.read();
        (guard.form.validate_contact()?, guard.form.shipping_address())
      };
      {
        let mut guard = ctx.write();
        guard.contact = Some(contact);
        guard.shipping_address = Some(address);
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  // Mirror image of the direct flow's guard: this path exists only for
  // online methods.
  p.on_root("require_online_method", |ctx: ContextData<PaymentIntentCtxData>| {
    Box::pin(async move {
      let payment_method = { ctx.read().form.payment_method };
      if !payment_method.is_online() {
        warn!("Non-online payment method submitted to the payment-intent endpoint.");
        return Err(AppError::Validation(
          "Cash on delivery orders are placed through the standard checkout.".to_string(),
        ));
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("price_cart", |ctx: ContextData<PaymentIntentCtxData>| {
    Box::pin(async move {
      let (pool, user_id) = {
        let guard = ctx.read();
        (guard.app_state.db_pool.clone(), guard.customer_id)
      };
      let cart = carts::fetch_priced_cart(&pool, user_id).await?;
      if cart.is_empty() {
        return Err(AppError::Validation("Your cart is empty.".to_string()));
      }
      {
        ctx.write().priced_cart = Some(cart);
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("apply_discount", |ctx: ContextData<PaymentIntentCtxData>| {
    Box::pin(async move {
      let (state, token, form, subtotal, customer_id) = {
        let guard = ctx.read();
        let subtotal = guard.priced_cart.as_ref().map(|c| c.subtotal_cents).unwrap_or(0);
        (
          guard.app_state.clone(),
          guard.session_token.clone(),
          guard.form.clone(),
          subtotal,
          guard.customer_id,
        )
      };
      let (amount, code) = common_steps::resolve_discount(&state, &token, &form, subtotal, customer_id).await?;
      {
        let mut guard = ctx.write();
        guard.discount_cents = amount;
        guard.applied_discount_code = code;
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("estimate_shipping", |ctx: ContextData<PaymentIntentCtxData>| {
    Box::pin(async move {
      let (state, form) = {
        let guard = ctx.read();
        (guard.app_state.clone(), guard.form.clone())
      };
      let shipping_cents = common_steps::estimate_shipping_cost(&state, &form).await?;
      {
        ctx.write().shipping_cents = shipping_cents;
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  // Create the gateway intent for the final amount and snapshot the
  // validated payload for phase (b). No COD fee on online payments.
  p.on_root("create_gateway_intent", |ctx: ContextData<PaymentIntentCtxData>| {
    Box::pin(async move {
      let (state, draft) = {
        let guard = ctx.read();
        let contact = guard
          .contact
          .clone()
          .ok_or_else(|| AppError::Internal("Contact fields missing before intent creation.".to_string()))?;
        let address = guard
          .shipping_address
          .clone()
          .ok_or_else(|| AppError::Internal("Shipping address missing before intent creation.".to_string()))?;
        let cart = guard
          .priced_cart
          .clone()
          .ok_or_else(|| AppError::Internal("Priced cart missing before intent creation.".to_string()))?;
        let draft = OrderDraft {
          user_id: guard.customer_id,
          customer_name: contact.name,
          customer_email: contact.email,
          customer_phone: contact.phone,
          shipping_address: address,
          delivery_type: guard.form.delivery_type,
          payment_method: guard.form.payment_method,
          lines: cart.draft_lines(),
          subtotal_cents: cart.subtotal_cents,
          discount_cents: guard.discount_cents,
          discount_code: guard.applied_discount_code.clone(),
          shipping_cents: guard.shipping_cents,
          cod_fee_cents: 0,
          currency: guard.app_state.config.currency.clone(),
        };
        (guard.app_state.clone(), draft)
      };

      let amount_cents = compute_total(draft.subtotal_cents, draft.discount_cents, draft.shipping_cents, 0);
      let user_id = draft.user_id;
      let currency = draft.currency.clone();
      let receipt = format!("chk_{}", Uuid::new_v4().simple());
      let intent = state.gateway.create_intent(amount_cents, &currency, &receipt).await?;

      sqlx::query(
        "INSERT INTO payment_intents (id, reference, user_id, amount_cents, currency, status, payload, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, NOW(), NOW())",
      )
      .bind(Uuid::new_v4())
      .bind(&intent.reference)
      .bind(user_id)
      .bind(amount_cents)
      .bind(&currency)
      .bind(PaymentIntentStatus::Created)
      .bind(Json(draft))
      .execute(&state.db_pool)
      .await?;

      info!(reference = %intent.reference, amount_cents, "Payment intent stored; awaiting confirmation.");
      {
        ctx.write().intent = Some(intent);
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  conductor.register_pipeline(p);
  info!("Payment-intent pipeline registered.");
}
