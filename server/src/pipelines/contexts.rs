// server/src/pipelines/contexts.rs

//! The underlying data structs the pipelines operate on. Handlers
//! receive these wrapped in `conductor::ContextData`.

use crate::models::{CartItem, Order, OrderItem, PaymentIntent, Product, VariantAttribute};
use crate::services::carts::PricedCart;
use crate::services::gateway::GatewayIntent;
use crate::state::AppState;
use crate::web::forms::{CheckoutForm, CustomerContact};
use crate::models::Address;
use chrono::{DateTime, Utc};
use uuid::Uuid;

// --- Accounts ---

#[derive(Clone)]
pub struct SignupCtxData {
  pub app_state: AppState,
  pub email: String,
  pub password: String,
  pub full_name: Option<String>,
  pub created_user_id: Option<Uuid>,
  pub session_token: Option<String>,
}

#[derive(Clone)]
pub struct SigninCtxData {
  pub app_state: AppState,
  pub email: String,
  pub password: String,
  pub temp_password_hash: Option<String>,
  pub user_id: Option<Uuid>,
  pub session_token: Option<String>,
  pub user_email_for_response: Option<String>,
}

// --- Cart ---

#[derive(Clone)]
pub struct AddToCartCtxData {
  pub app_state: AppState,
  pub user_id: Uuid,
  pub product_id: Uuid,
  pub quantity: i32,
  pub variant: Vec<VariantAttribute>,
  pub fetched_product: Option<Product>,
  pub updated_cart_item: Option<CartItem>,
}

// --- Checkout (direct form submission, COD) ---

#[derive(Clone)]
pub struct CheckoutCtxData {
  pub app_state: AppState,
  pub session_token: String,
  pub customer_id: Uuid,
  pub form: CheckoutForm,
  pub submitted_at: DateTime<Utc>,

  // Populated by the pipeline:
  pub contact: Option<CustomerContact>,
  pub shipping_address: Option<Address>,
  pub priced_cart: Option<PricedCart>,
  pub discount_cents: i64,
  pub applied_discount_code: Option<String>,
  pub shipping_cents: i64,
  pub cod_fee_cents: i64,
  pub created_order: Option<Order>,
  pub created_items: Vec<OrderItem>,
}

impl CheckoutCtxData {
  pub fn new(app_state: AppState, session_token: String, customer_id: Uuid, form: CheckoutForm) -> Self {
    Self {
      app_state,
      session_token,
      customer_id,
      form,
      submitted_at: Utc::now(),
      contact: None,
      shipping_address: None,
      priced_cart: None,
      discount_cents: 0,
      applied_discount_code: None,
      shipping_cents: 0,
      cod_fee_cents: 0,
      created_order: None,
      created_items: Vec::new(),
    }
  }
}

// --- Online payment, phase (a): intent creation ---

#[derive(Clone)]
pub struct PaymentIntentCtxData {
  pub app_state: AppState,
  pub session_token: String,
  pub customer_id: Uuid,
  pub form: CheckoutForm,
  pub submitted_at: DateTime<Utc>,

  // Populated by the pipeline:
  pub contact: Option<CustomerContact>,
  pub shipping_address: Option<Address>,
  pub priced_cart: Option<PricedCart>,
  pub discount_cents: i64,
  pub applied_discount_code: Option<String>,
  pub shipping_cents: i64,
  pub intent: Option<GatewayIntent>,
}

impl PaymentIntentCtxData {
  pub fn new(app_state: AppState, session_token: String, customer_id: Uuid, form: CheckoutForm) -> Self {
    Self {
      app_state,
      session_token,
      customer_id,
      form,
      submitted_at: Utc::now(),
      contact: None,
      shipping_address: None,
      priced_cart: None,
      discount_cents: 0,
      applied_discount_code: None,
      shipping_cents: 0,
      intent: None,
    }
  }
}

// --- Online payment, phase (b): verified confirmation ---

#[derive(Clone)]
pub struct PaymentConfirmCtxData {
  pub app_state: AppState,
  /// Present when the widget posts from the customer's browser session.
  pub session_token: Option<String>,
  pub reference: String,
  pub gateway_payment_id: String,
  pub signature: String,

  // Populated by the pipeline:
  pub intent: Option<PaymentIntent>,
  pub created_order: Option<Order>,
  pub created_items: Vec<OrderItem>,
}
