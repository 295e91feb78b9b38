// server/src/web/forms.rs

//! The checkout form: the classic field set submitted by the checkout
//! page, and the validation that turns it into typed values.

use crate::errors::AppError;
use crate::models::{Address, DeliveryType, PaymentMethod};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutForm {
  pub customer_name: String,
  pub customer_email: String,
  pub phone: String,
  #[serde(default)]
  pub phone_code: String,
  pub address: String,
  #[serde(default)]
  pub city: String,
  #[serde(default)]
  pub state: String,
  #[serde(default)]
  pub zip: String,
  pub country: String,
  #[serde(default)]
  pub country_name: String,
  pub delivery_type: DeliveryType,
  pub payment_method: PaymentMethod,
  #[serde(default)]
  pub discount_code: Option<String>,
  pub csrf_token: String,
  /// Honeypot. Hidden on the page; legitimate browsers submit it empty.
  #[serde(default)]
  pub hp_website_check: String,
  #[serde(default)]
  pub place_order: Option<String>,
}

/// Validated contact fields, ready to snapshot onto an order.
#[derive(Debug, Clone)]
pub struct CustomerContact {
  pub name: String,
  pub email: String,
  pub phone: String,
}

fn digit_count(s: &str) -> usize {
  s.chars().filter(|c| c.is_ascii_digit()).count()
}

impl CheckoutForm {
  /// Required-field and format checks: name, email, phone, and country
  /// must be present; the email must parse as an address; the phone must
  /// carry at least 7 digits once separators are stripped.
  pub fn validate_contact(&self) -> Result<CustomerContact, AppError> {
    let name = self.customer_name.trim();
    let email = self.customer_email.trim();
    let phone = self.phone.trim();
    let country = self.country.trim();

    if name.is_empty() || email.is_empty() || phone.is_empty() || country.is_empty() {
      return Err(AppError::Validation("Please fill in all required fields.".to_string()));
    }
    if !validator::validate_email(email) {
      return Err(AppError::Validation("Please provide a valid email address.".to_string()));
    }
    if digit_count(phone) < 7 {
      return Err(AppError::Validation("Please provide a valid phone number.".to_string()));
    }

    Ok(CustomerContact {
      name: name.to_string(),
      email: email.to_string(),
      phone: format!("{}{}", self.phone_code.trim(), phone),
    })
  }

  pub fn shipping_address(&self) -> Address {
    Address {
      line1: self.address.trim().to_string(),
      city: self.city.trim().to_string(),
      state: self.state.trim().to_string(),
      zip: self.zip.trim().to_string(),
      country_code: self.country.trim().to_string(),
      country: self.country_name.trim().to_string(),
    }
  }

  /// The discount code as explicitly submitted this request, if any.
  pub fn submitted_discount_code(&self) -> Option<String> {
    self
      .discount_code
      .as_deref()
      .map(str::trim)
      .filter(|code| !code.is_empty())
      .map(str::to_string)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn valid_form() -> CheckoutForm {
    CheckoutForm {
      customer_name: "Asha Rao".to_string(),
      customer_email: "asha@example.com".to_string(),
      phone: "98765-43210".to_string(),
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
      csrf_token: "token".to_string(),
      hp_website_check: String::new(),
      place_order: Some("1".to_string()),
    }
  }

  #[test]
  fn valid_form_produces_contact_with_dial_code() {
    let contact = valid_form().validate_contact().unwrap();
    assert_eq!(contact.name, "Asha Rao");
    assert_eq!(contact.phone, "+9198765-43210");
  }

  #[test]
  fn missing_required_field_is_rejected() {
    let mut form = valid_form();
    form.customer_name = "  ".to_string();
    assert!(form.validate_contact().is_err());
  }

  #[test]
  fn malformed_email_is_rejected() {
    let mut form = valid_form();
    form.customer_email = "not-an-email".to_string();
    assert!(form.validate_contact().is_err());
  }

  #[test]
  fn phone_with_fewer_than_seven_digits_is_rejected() {
    let mut form = valid_form();
    form.phone = "12-34-56".to_string();
    assert!(form.validate_contact().is_err());
  }

  #[test]
  fn phone_separators_do_not_count_as_digits() {
    let mut form = valid_form();
    form.phone = "(123) 456-7".to_string(); // 7 digits with separators
    assert!(form.validate_contact().is_ok());
  }

  #[test]
  fn submitted_discount_code_is_trimmed_and_empty_is_none() {
    let mut form = valid_form();
    form.discount_code = Some("  SAVE10  ".to_string());
    assert_eq!(form.submitted_discount_code().as_deref(), Some("SAVE10"));
    form.discount_code = Some("   ".to_string());
    assert!(form.submitted_discount_code().is_none());
  }

  #[test]
  fn shipping_address_maps_form_fields() {
    let address = valid_form().shipping_address();
    assert_eq!(address.zip, "411001");
    assert_eq!(address.country_code, "IN");
    assert_eq!(address.country, "India");
  }
}
