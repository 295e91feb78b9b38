// server/src/services/discounts.rs

//! Discount code evaluation and redemption.
//!
//! Evaluation is read-only and side-effect free; redemption is a guarded
//! counter increment that runs inside the order transaction so concurrent
//! checkouts cannot over-redeem a limited code.

use crate::errors::AppError;
use crate::models::{Discount, DiscountKind};
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use thiserror::Error;
use tracing::{info, instrument, warn};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiscountError {
  #[error("That discount code is not valid.")]
  UnknownCode,

  #[error("That discount code is no longer active.")]
  Inactive,

  #[error("That discount code is not valid yet.")]
  NotYetValid,

  #[error("That discount code has expired.")]
  Expired,

  #[error("A minimum purchase of {}.{:02} is required to use this code.", .0 / 100, .0 % 100)]
  BelowMinimum(i64),

  #[error("That discount code has reached its usage limit.")]
  UsageLimitReached,
}

/// Checks every redemption rule against the cart total at `now`.
pub fn evaluate(discount: &Discount, cart_total_cents: i64, now: DateTime<Utc>) -> Result<(), DiscountError> {
  if !discount.active {
    return Err(DiscountError::Inactive);
  }
  if let Some(valid_from) = discount.valid_from {
    if now < valid_from {
      return Err(DiscountError::NotYetValid);
    }
  }
  if let Some(valid_until) = discount.valid_until {
    if now > valid_until {
      return Err(DiscountError::Expired);
    }
  }
  if cart_total_cents < discount.min_purchase_cents {
    return Err(DiscountError::BelowMinimum(discount.min_purchase_cents));
  }
  if let Some(limit) = discount.usage_limit {
    if discount.used_count >= limit {
      return Err(DiscountError::UsageLimitReached);
    }
  }
  Ok(())
}

/// Computes the deduction for an already-validated code. Percentage
/// discounts honor the optional ceiling; fixed discounts are capped at
/// the cart total so the resulting total can never go negative.
pub fn deduction(discount: &Discount, cart_total_cents: i64) -> i64 {
  match discount.kind {
    DiscountKind::Percentage => {
      let raw = cart_total_cents * discount.value / 100;
      match discount.max_discount_cents {
        Some(ceiling) => raw.min(ceiling),
        None => raw,
      }
    }
    DiscountKind::Fixed => discount.value.min(cart_total_cents),
  }
}

/// Resolves `code` against the current cart total for `customer_id` and
/// returns the discount amount in cents, or the specific rule violation.
#[instrument(name = "discounts::calculate_amount", skip(pool), fields(code = %code, customer_id = %customer_id))]
pub async fn calculate_amount(pool: &PgPool, code: &str, cart_total_cents: i64, customer_id: Uuid) -> Result<i64, AppError> {
  let discount: Option<Discount> = sqlx::query_as(
    "SELECT id, code, kind, value, min_purchase_cents, max_discount_cents, usage_limit, used_count, \
     valid_from, valid_until, active, created_at, updated_at \
     FROM discounts WHERE code = $1",
  )
  .bind(code)
  .fetch_optional(pool)
  .await?;

  let Some(discount) = discount else {
    warn!("Unknown discount code submitted.");
    return Err(AppError::Discount(DiscountError::UnknownCode));
  };

  evaluate(&discount, cart_total_cents, Utc::now()).map_err(AppError::Discount)?;

  let amount = deduction(&discount, cart_total_cents);
  info!(amount_cents = amount, "Discount code validated.");
  Ok(amount)
}

/// Redeems `code` inside the order transaction. The increment is guarded
/// by the usage limit in the same statement, so a concurrent checkout
/// that exhausts the code makes this one fail rather than over-redeem.
#[instrument(name = "discounts::redeem", skip(tx), fields(code = %code))]
pub async fn redeem(tx: &mut Transaction<'_, Postgres>, code: &str) -> Result<(), AppError> {
  let result = sqlx::query(
    "UPDATE discounts SET used_count = used_count + 1, updated_at = NOW() \
     WHERE code = $1 AND active AND (usage_limit IS NULL OR used_count < usage_limit)",
  )
  .bind(code)
  .execute(&mut **tx)
  .await?;

  if result.rows_affected() == 0 {
    warn!("Discount redemption lost the race or code became unusable.");
    return Err(AppError::Discount(DiscountError::UsageLimitReached));
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::Duration;

  fn base_discount(kind: DiscountKind, value: i64) -> Discount {
    let now = Utc::now();
    Discount {
      id: Uuid::new_v4(),
      code: "SAVE10".to_string(),
      kind,
      value,
      min_purchase_cents: 0,
      max_discount_cents: None,
      usage_limit: None,
      used_count: 0,
      valid_from: None,
      valid_until: None,
      active: true,
      created_at: now,
      updated_at: now,
    }
  }

  #[test]
  fn percentage_deduction_of_cart_total() {
    let d = base_discount(DiscountKind::Percentage, 10);
    assert_eq!(deduction(&d, 1000_00), 100_00);
  }

  #[test]
  fn percentage_deduction_respects_ceiling() {
    let mut d = base_discount(DiscountKind::Percentage, 50);
    d.max_discount_cents = Some(75_00);
    assert_eq!(deduction(&d, 1000_00), 75_00);
  }

  #[test]
  fn fixed_deduction_is_capped_at_cart_total() {
    let d = base_discount(DiscountKind::Fixed, 900_00);
    assert_eq!(deduction(&d, 500_00), 500_00);
  }

  #[test]
  fn inactive_code_is_rejected() {
    let mut d = base_discount(DiscountKind::Fixed, 100);
    d.active = false;
    assert_eq!(evaluate(&d, 1000, Utc::now()), Err(DiscountError::Inactive));
  }

  #[test]
  fn expired_code_is_rejected() {
    let mut d = base_discount(DiscountKind::Percentage, 10);
    d.valid_until = Some(Utc::now() - Duration::days(1));
    assert_eq!(evaluate(&d, 1000, Utc::now()), Err(DiscountError::Expired));
  }

  #[test]
  fn not_yet_valid_code_is_rejected() {
    let mut d = base_discount(DiscountKind::Percentage, 10);
    d.valid_from = Some(Utc::now() + Duration::days(1));
    assert_eq!(evaluate(&d, 1000, Utc::now()), Err(DiscountError::NotYetValid));
  }

  #[test]
  fn below_minimum_purchase_is_rejected() {
    let mut d = base_discount(DiscountKind::Percentage, 10);
    d.min_purchase_cents = 500_00;
    assert_eq!(evaluate(&d, 499_99, Utc::now()), Err(DiscountError::BelowMinimum(500_00)));
    assert!(evaluate(&d, 500_00, Utc::now()).is_ok());
  }

  #[test]
  fn exhausted_usage_limit_is_rejected() {
    let mut d = base_discount(DiscountKind::Percentage, 10);
    d.usage_limit = Some(3);
    d.used_count = 3;
    assert_eq!(evaluate(&d, 1000, Utc::now()), Err(DiscountError::UsageLimitReached));
  }

  #[test]
  fn valid_code_within_window_passes() {
    let mut d = base_discount(DiscountKind::Percentage, 10);
    d.valid_from = Some(Utc::now() - Duration::days(1));
    d.valid_until = Some(Utc::now() + Duration::days(1));
    d.usage_limit = Some(5);
    d.used_count = 4;
    assert!(evaluate(&d, 1000, Utc::now()).is_ok());
  }
}
