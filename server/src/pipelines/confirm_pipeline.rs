// server/src/pipelines/confirm_pipeline.rs

//! Phase (b) of online payment: the client widget reports a signed
//! confirmation. The signature verifies first, against the gateway
//! shared secret, before anything is read or written; only then is the
//! snapshotted checkout payload turned into a durable order. A forged or
//! tampered confirmation creates nothing.

use crate::errors::AppError;
use crate::models::{PaymentIntent, PaymentIntentStatus};
use crate::pipelines::common_steps;
use crate::pipelines::contexts::PaymentConfirmCtxData;
use crate::services::{carts, orders};
use crate::state::AppState;
use conductor::{Conductor, ContextData, Pipeline, PipelineControl};
use std::sync::Arc;
use tracing::{info, warn};

const PAYMENT_INTENT_COLUMNS: &str =
  "id, reference, user_id, amount_cents, currency, status, payload, gateway_payment_id, created_at, updated_at";

pub fn register_payment_confirm_pipeline(conductor: &Arc<Conductor<AppError>>, _app_state: &AppState) {
  let mut p = Pipeline::<PaymentConfirmCtxData, AppError>::new(&[
    ("verify_confirmation_signature", false, None),
    ("load_payment_intent", false, None),
    ("persist_order_from_intent", false, None),
    ("clear_cart", false, None),
  ]);

  // Step 1: cryptographic verification. Pure computation over the shared
  // secret; an invalid triple is rejected before any state is touched.
  p.on_root("verify_confirmation_signature", |ctx: ContextData<PaymentConfirmCtxData>| {
    Box::pin(async move {
      let (state, reference, payment_id, signature) = {
        let guard = ctx.read();
        (
          guard.app_state.clone(),
          guard.reference.clone(),
          guard.gateway_payment_id.clone(),
          guard.signature.clone(),
        )
      };
      if !state.gateway.verify_confirmation(&reference, &payment_id, &signature) {
        warn!(reference = %reference, "Payment confirmation failed signature verification.");
        return Err(AppError::Payment(
          "Payment confirmation could not be verified.".to_string(),
        ));
      }
      info!(reference = %reference, "Payment confirmation signature verified.");
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  // Step 2: fetch the pending intent; a reference that is unknown or
  // already consumed cannot create another order.
  p.on_root("load_payment_intent", |ctx: ContextData<PaymentConfirmCtxData>| {
    Box::pin(async move {
      let (pool, reference) = {
        let guard = ctx.read();
        (guard.app_state.db_pool.clone(), guard.reference.clone())
      };

      let intent: Option<PaymentIntent> = sqlx::query_as(&format!(
        "SELECT {PAYMENT_INTENT_COLUMNS} FROM payment_intents WHERE reference = $1"
      ))
      .bind(&reference)
      .fetch_optional(&pool)
      .await?;

      let Some(intent) = intent else {
        warn!(reference = %reference, "Confirmation for an unknown payment reference.");
        return Err(AppError::NotFound("No payment is pending for this reference.".to_string()));
      };
      if intent.status != PaymentIntentStatus::Created {
        warn!(reference = %reference, status = ?intent.status, "Confirmation replayed for a settled intent.");
        return Err(AppError::Validation("This payment has already been processed.".to_string()));
      }

      {
        ctx.write().intent = Some(intent);
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  // Step 3: claim the intent, then turn the stored snapshot into the
  // order. The claim is a conditional update, so two confirmations
  // racing on one reference resolve to a single order.
  p.on_root("persist_order_from_intent", |ctx: ContextData<PaymentConfirmCtxData>| {
    Box::pin(async move {
      let (state, intent, payment_id) = {
        let guard = ctx.read();
        let intent = guard
          .intent
          .clone()
          .ok_or_else(|| AppError::Internal("Payment intent missing before order creation.".to_string()))?;
        (guard.app_state.clone(), intent, guard.gateway_payment_id.clone())
      };

      let claimed = sqlx::query(
        "UPDATE payment_intents SET status = $1, gateway_payment_id = $2, updated_at = NOW() \
         WHERE id = $3 AND status = $4",
      )
      .bind(PaymentIntentStatus::Confirmed)
      .bind(&payment_id)
      .bind(intent.id)
      .bind(PaymentIntentStatus::Created)
      .execute(&state.db_pool)
      .await?;
      if claimed.rows_affected() == 0 {
        warn!(reference = %intent.reference, "Lost the claim race; intent already settled.");
        return Err(AppError::Validation("This payment has already been processed.".to_string()));
      }

      let (order, items) = orders::create_order(&state.db_pool, &intent.payload.0).await?;

      info!(order_number = %order.order_number, reference = %intent.reference, "Order created from verified payment.");
      {
        let mut guard = ctx.write();
        guard.created_order = Some(order);
        guard.created_items = items;
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  // After-hook: best-effort courier registration, same as the direct
  // flow.
  p.after_root("persist_order_from_intent", |ctx: ContextData<PaymentConfirmCtxData>| {
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

  // Step 4: the cart that produced the snapshot is done.
  p.on_root("clear_cart", |ctx: ContextData<PaymentConfirmCtxData>| {
    Box::pin(async move {
      let (state, session_token, user_id) = {
        let guard = ctx.read();
        let user_id = guard.intent.as_ref().map(|i| i.user_id);
        (guard.app_state.clone(), guard.session_token.clone(), user_id)
      };
      if let Some(user_id) = user_id {
        carts::clear_cart(&state.db_pool, user_id).await?;
      }
      if let Some(token) = session_token {
        state.sessions.set_pending_discount(&token, None);
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  conductor.register_pipeline(p);
  info!("Payment-confirmation pipeline registered.");
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::AppConfig;
  use crate::services::carrier::test_support::StaticCarrier;
  use crate::services::gateway::HostedGateway;
  use crate::services::session::SessionStore;
  use sqlx::postgres::PgPoolOptions;

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
    register_payment_confirm_pipeline(&conductor, &state);
    state
  }

  // A forged signature must be rejected before any database access; the
  // lazy pool in this state would fail loudly if the pipeline got that
  // far.
  #[tokio::test]
  async fn tampered_signature_creates_no_order() {
    let state = test_state();
    let ctx = ContextData::new(PaymentConfirmCtxData {
      app_state: state.clone(),
      session_token: None,
      reference: "intent_123".to_string(),
      gateway_payment_id: "pay_456".to_string(),
      signature: "deadbeef".to_string(),
      intent: None,
      created_order: None,
      created_items: Vec::new(),
    });

    let result = state.conductor.run(ctx.clone()).await;
    match result {
      Err(AppError::Payment(message)) => assert!(message.contains("verified"), "message: {}", message),
      other => panic!("expected Payment error, got {:?}", other.err()),
    }
    assert!(ctx.read().created_order.is_none());
  }
}
