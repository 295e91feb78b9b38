// server/src/pipelines/checkout_pipeline.rs

//! The direct checkout flow: one pipeline from throttle check to cart
//! clearing. Every step either continues with the context enriched or
//! fails with the specific `AppError` the customer should see; nothing
//! before `persist_order` has side effects beyond the session throttle
//! stamp.

use crate::errors::AppError;
use crate::models::{DeliveryType, OrderDraft, PaymentMethod};
use crate::pipelines::common_steps;
use crate::pipelines::contexts::CheckoutCtxData;
use crate::services::{carts, orders};
use crate::state::AppState;
use conductor::{Conductor, ContextData, Pipeline, PipelineControl};
use std::sync::Arc;
use tracing::{info, warn};

pub fn register_checkout_pipeline(conductor: &Arc<Conductor<AppError>>, _app_state: &AppState) {
  let mut p = Pipeline::<CheckoutCtxData, AppError>::new(&[
    ("enforce_submit_throttle", false, None),
    ("check_honeypot", false, None),
    ("verify_csrf_token", false, None),
    ("validate_contact_fields", false, None),
    ("reject_online_methods", false, None),
    ("price_cart", false, None),
    ("apply_discount", false, None),
    (
      "estimate_shipping",
      false,
      // Pickup orders carry zero shipping and never hit the carrier.
      Some(Arc::new(|ctx: ContextData<CheckoutCtxData>| {
        ctx.read().form.delivery_type == DeliveryType::Pickup
      })),
    ),
    (
      "apply_cod_fee",
      false,
      Some(Arc::new(|ctx: ContextData<CheckoutCtxData>| {
        ctx.read().form.payment_method != PaymentMethod::CashOnDelivery
      })),
    ),
    ("persist_order", false, None),
    ("clear_cart", false, None),
  ]);

  // Step 1: session-local resubmit throttle.
  p.on_root("enforce_submit_throttle", |ctx: ContextData<CheckoutCtxData>| {
    Box::pin(async move {
      let (state, token, submitted_at) = {
        let guard = ctx.read();
        (guard.app_state.clone(), guard.session_token.clone(), guard.submitted_at)
      };
      common_steps::enforce_submit_throttle(&state, &token, submitted_at)?;
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  // Step 2: honeypot.
  p.on_root("check_honeypot", |ctx: ContextData<CheckoutCtxData>| {
    Box::pin(async move {
      {
        let guard = ctx.read();
        common_steps::check_honeypot(&guard.form)?;
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  // Step 3: CSRF token bound to the session at form render.
  p.on_root("verify_csrf_token", |ctx: ContextData<CheckoutCtxData>| {
    Box::pin(async move {
      {
        let guard = ctx.read();
        common_steps::verify_csrf_token(&guard.app_state, &guard.session_token, &guard.form)?;
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  // Step 4: required fields, email grammar, phone digits.
  p.on_root("validate_contact_fields", |ctx: ContextData<CheckoutCtxData>| {
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

  // Step 5: online methods are only finalized via the verified
  // confirmation path, never as a direct form POST.
  p.on_root("reject_online_methods", |ctx: ContextData<CheckoutCtxData>| {
    Box::pin(async move {
      let payment_method = { ctx.read().form.payment_method };
      if payment_method.is_online() {
        warn!("Online payment method submitted as a direct checkout POST.");
        return Err(AppError::Payment(
          "Online payments cannot be submitted directly. Please complete your payment through the payment widget."
            .to_string(),
        ));
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  // Step 6: load and price the cart; this is the snapshot the order
  // items will be created from.
  p.on_root("price_cart", |ctx: ContextData<CheckoutCtxData>| {
    Box::pin(async move {
      let (pool, user_id) = {
        let guard = ctx.read();
        (guard.app_state.db_pool.clone(), guard.customer_id)
      };
      let cart = carts::fetch_priced_cart(&pool, user_id).await?;
      if cart.is_empty() {
        return Err(AppError::Validation("Your cart is empty.".to_string()));
      }
      info!(lines = cart.lines.len(), subtotal_cents = cart.subtotal_cents, "Cart priced for checkout.");
      {
        ctx.write().priced_cart = Some(cart);
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  // Step 7: discount resolution against the current subtotal.
  p.on_root("apply_discount", |ctx: ContextData<CheckoutCtxData>| {
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

  // Step 8: carrier rate for delivery orders (skipped for pickup).
  p.on_root("estimate_shipping", |ctx: ContextData<CheckoutCtxData>| {
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

  // Step 9: flat COD surcharge (skipped for other methods).
  p.on_root("apply_cod_fee", |ctx: ContextData<CheckoutCtxData>| {
    Box::pin(async move {
      let fee = { ctx.read().app_state.config.cod_fee_cents };
      {
        ctx.write().cod_fee_cents = fee;
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  // Step 10: the one transactional unit: order, snapshot items,
  // discount redemption, stock decrement.
  p.on_root("persist_order", |ctx: ContextData<CheckoutCtxData>| {
    Box::pin(async move {
      let (pool, draft) = {
        let guard = ctx.read();
        let contact = guard
          .contact
          .clone()
          .ok_or_else(|| AppError::Internal("Contact fields missing before order creation.".to_string()))?;
        let address = guard
          .shipping_address
          .clone()
          .ok_or_else(|| AppError::Internal("Shipping address missing before order creation.".to_string()))?;
        let cart = guard
          .priced_cart
          .clone()
          .ok_or_else(|| AppError::Internal("Priced cart missing before order creation.".to_string()))?;
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
          cod_fee_cents: guard.cod_fee_cents,
          currency: guard.app_state.config.currency.clone(),
        };
        (guard.app_state.db_pool.clone(), draft)
      };

      let (order, items) = orders::create_order(&pool, &draft).await?;
      {
        let mut guard = ctx.write();
        guard.created_order = Some(order);
        guard.created_items = items;
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  // After-hook on persist: best-effort courier registration. Never fails
  // the checkout.
  p.after_root("persist_order", |ctx: ContextData<CheckoutCtxData>| {
    Box::pin(async move {
      let (state, order, items) = {
        let guard = ctx.read();
        (guard.app_state.clone(), guard.created_order.clone(), guard.created_items.clone())
      };
      if let Some(order) = order {
        common_steps::dispatch_shipment(&state, &order, &items).await;
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  // Step 11: empty the cart and drop the carried discount code.
  p.on_root("clear_cart", |ctx: ContextData<CheckoutCtxData>| {
    Box::pin(async move {
      let (state, token, user_id) = {
        let guard = ctx.read();
        (guard.app_state.clone(), guard.session_token.clone(), guard.customer_id)
      };
      carts::clear_cart(&state.db_pool, user_id).await?;
      state.sessions.set_pending_discount(&token, None);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  conductor.register_pipeline(p);
  info!("Checkout pipeline registered.");
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::AppConfig;
  use crate::errors::AppError;
  use crate::services::carrier::test_support::StaticCarrier;
  use crate::services::gateway::HostedGateway;
  use crate::services::session::SessionStore;
  use crate::web::forms::CheckoutForm;
  use sqlx::postgres::PgPoolOptions;
  use uuid::Uuid;

  // Builds an AppState whose pool is lazy (never connects) so the steps
  // ahead of any database access can be exercised hermetically.
  fn test_state() -> AppState {
    let config = AppConfig {
      server_host: "127.0.0.1".to_string(),
      server_port: 0,
      database_url: "postgres://localhost/unused".to_string(),
      app_base_url: "http://127.0.0.1".to_string(),
      currency: "INR".to_string(),
      cod_fee_cents: 20_00,
      checkout_throttle_secs: 5,
      http_timeout_secs: 1,
      carrier_base_url: "https://carrier.localhost".to_string(),
      carrier_api_key: "test".to_string(),
      gateway_base_url: "https://gateway.localhost".to_string(),
      gateway_key_id: "key_test".to_string(),
      gateway_key_secret: "secret_test".to_string(),
    };
    let pool = PgPoolOptions::new()
      .acquire_timeout(std::time::Duration::from_secs(2))
      .connect_lazy(&config.database_url)
      .expect("lazy pool");
    let conductor = Arc::new(Conductor::<AppError>::new());
    let gateway = HostedGateway::from_config(&config).expect("gateway");
    let state = AppState {
      db_pool: pool,
      conductor: conductor.clone(),
      config: Arc::new(config),
      sessions: Arc::new(SessionStore::new()),
      carrier: Arc::new(StaticCarrier {
        quote_cents: 50_00,
        unserviceable_message: None,
      }),
      gateway: Arc::new(gateway),
    };
    register_checkout_pipeline(&conductor, &state);
    state
  }

  fn cod_form(csrf_token: &str) -> CheckoutForm {
    CheckoutForm {
      customer_name: "Asha Rao".to_string(),
      customer_email: "asha@example.com".to_string(),
      phone: "9876543210".to_string(),
      phone_code: "+91".to_string(),
      address: "12 Lake Road".to_string(),
      city: "Pune".to_string(),
      state: "MH".to_string(),
      zip: "411001".to_string(),
      country: "IN".to_string(),
      country_name: "India".to_string(),
      delivery_type: DeliveryType::Delivery,
      payment_method: PaymentMethod::CashOnDelivery,
      discount_code: None,
      csrf_token: csrf_token.to_string(),
      hp_website_check: String::new(),
      place_order: Some("1".to_string()),
    }
  }

  async fn run_checkout(state: &AppState, token: &str, form: CheckoutForm) -> Result<conductor::PipelineResult, AppError> {
    let ctx = ContextData::new(CheckoutCtxData::new(state.clone(), token.to_string(), Uuid::new_v4(), form));
    state.conductor.run(ctx).await
  }

  #[tokio::test]
  async fn honeypot_submission_is_rejected_with_generic_security_error() {
    let state = test_state();
    let (token, session) = state.sessions.create_for_user(Uuid::new_v4());
    let mut form = cod_form(&session.csrf_token);
    form.hp_website_check = "http://spam.example".to_string();

    let result = run_checkout(&state, &token, form).await;
    assert!(matches!(result, Err(AppError::Security)));
  }

  #[tokio::test]
  async fn csrf_mismatch_is_fatal() {
    let state = test_state();
    let (token, _session) = state.sessions.create_for_user(Uuid::new_v4());
    let form = cod_form("some-other-token");

    let result = run_checkout(&state, &token, form).await;
    assert!(matches!(result, Err(AppError::Security)));
  }

  #[tokio::test]
  async fn online_method_as_direct_post_is_always_rejected() {
    let state = test_state();
    let (token, session) = state.sessions.create_for_user(Uuid::new_v4());
    let mut form = cod_form(&session.csrf_token);
    form.payment_method = PaymentMethod::CreditCard;

    let result = run_checkout(&state, &token, form).await;
    match result {
      Err(AppError::Payment(message)) => assert!(message.contains("payment widget"), "message: {}", message),
      other => panic!("expected Payment rejection, got {:?}", other.err()),
    }
  }

  #[tokio::test]
  async fn second_submission_within_window_is_rate_limited() {
    let state = test_state();
    let (token, session) = state.sessions.create_for_user(Uuid::new_v4());

    // First attempt passes the throttle and dies later (CSRF is fine,
    // but the lazy pool cannot actually reach a database).
    let first = run_checkout(&state, &token, cod_form(&session.csrf_token)).await;
    assert!(first.is_err());

    let second = run_checkout(&state, &token, cod_form(&session.csrf_token)).await;
    assert!(matches!(second, Err(AppError::RateLimited { .. })), "second submission must hit the throttle");
  }

  #[tokio::test]
  async fn malformed_contact_fields_fail_before_any_io() {
    let state = test_state();
    let (token, session) = state.sessions.create_for_user(Uuid::new_v4());
    let mut form = cod_form(&session.csrf_token);
    form.customer_email = "not-an-email".to_string();

    let result = run_checkout(&state, &token, form).await;
    assert!(matches!(result, Err(AppError::Validation(_))));
  }
}
