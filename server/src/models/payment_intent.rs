// server/src/models/payment_intent.rs

use crate::models::order::OrderDraft;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::types::Json;
use sqlx::{FromRow, Type as SqlxType};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, SqlxType)]
#[sqlx(type_name = "payment_intent_status_enum", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentIntentStatus {
  Created,
  Confirmed,
  Failed,
}

/// Bridge between the two phases of online payment confirmation: created
/// with the gateway handle and a snapshot of the validated checkout
/// payload, consumed once a signed confirmation verifies.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PaymentIntent {
  pub id: Uuid,
  /// The gateway's reference for this intent; what the client widget and
  /// the signed confirmation both carry.
  pub reference: String,
  pub user_id: Uuid,
  pub amount_cents: i64,
  pub currency: String,
  pub status: PaymentIntentStatus,
  pub payload: Json<OrderDraft>,
  pub gateway_payment_id: Option<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}
