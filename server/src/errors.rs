// server/src/errors.rs

use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

use crate::services::discounts::DiscountError;
use conductor::ConductorError;

/// Single generic message for security-grade rejections (CSRF mismatch,
/// honeypot). Which check failed must not be visible in the response.
pub const SECURITY_REJECTION_MESSAGE: &str = "Your request could not be processed. Please reload the page and try again.";

#[derive(Debug, Error)]
pub enum AppError {
  #[error("Validation Error: {0}")]
  Validation(String),

  /// CSRF mismatch or honeypot trip. Rendered with one generic message.
  #[error("Security check failed")]
  Security,

  #[error("Authentication Failed: {0}")]
  Auth(String),

  #[error("Resource Not Found: {0}")]
  NotFound(String),

  #[error("Too many checkout attempts")]
  RateLimited { retry_after_secs: i64 },

  #[error("{0}")]
  Discount(#[from] DiscountError),

  #[error("Shipping Error: {0}")]
  Shipping(String),

  #[error("Payment Error: {0}")]
  Payment(String),

  #[error("Payment Gateway Error: {0}")]
  Gateway(String),

  #[error("Database Error: {0}")]
  Sqlx(#[from] sqlx::Error),

  #[error("Configuration Error: {0}")]
  Config(String),

  #[error("Pipeline Error: {source}")]
  Flow {
    #[from]
    source: ConductorError,
  },

  #[error("Internal Server Error: {0}")]
  Internal(String),
}

// Convenience for handlers using `?` on anyhow-returning helpers.
impl From<anyhow::Error> for AppError {
  fn from(err: anyhow::Error) -> Self {
    if err.is::<sqlx::Error>() {
      if let Ok(sqlx_err) = err.downcast::<sqlx::Error>() {
        return AppError::Sqlx(sqlx_err);
      }
      return AppError::Internal("Database error".to_string());
    }
    AppError::Internal(err.to_string())
  }
}

impl ResponseError for AppError {
  fn error_response(&self) -> HttpResponse {
    // Log the full error when it becomes a response; the body below is
    // what the customer sees.
    tracing::error!(application_error = %self, "Responding with error");
    match self {
      AppError::Validation(m) => HttpResponse::BadRequest().json(json!({"error": m})),
      AppError::Security => HttpResponse::BadRequest().json(json!({"error": SECURITY_REJECTION_MESSAGE})),
      AppError::Auth(m) => HttpResponse::Unauthorized().json(json!({"error": m})),
      AppError::NotFound(m) => HttpResponse::NotFound().json(json!({"error": m})),
      AppError::RateLimited { retry_after_secs } => HttpResponse::TooManyRequests().json(json!({
        "error": "Please wait a few seconds before submitting your order again.",
        "retryAfterSecs": retry_after_secs,
      })),
      AppError::Discount(e) => HttpResponse::UnprocessableEntity().json(json!({"error": e.to_string()})),
      AppError::Shipping(m) => HttpResponse::UnprocessableEntity().json(json!({"error": m})),
      AppError::Payment(m) => HttpResponse::PaymentRequired().json(json!({"error": m})),
      AppError::Gateway(m) => {
        HttpResponse::BadGateway().json(json!({"error": "Payment provider is unavailable.", "detail": m}))
      }
      AppError::Sqlx(_) => HttpResponse::InternalServerError().json(json!({"error": "Database operation failed"})),
      AppError::Config(m) => {
        HttpResponse::InternalServerError().json(json!({"error": "Configuration issue", "detail": m}))
      }
      AppError::Flow { source } => {
        tracing::error!(conductor_error_source = ?source, "Pipeline error details");
        HttpResponse::InternalServerError()
          .json(json!({"error": "Request processing error", "detail": source.to_string()}))
      }
      AppError::Internal(m) => {
        HttpResponse::InternalServerError().json(json!({"error": "An internal error occurred", "detail": m}))
      }
    }
  }
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;
