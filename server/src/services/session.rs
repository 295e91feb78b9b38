// server/src/services/session.rs

//! In-process session store.
//!
//! Carries exactly the per-visitor state the checkout flow needs: the
//! CSRF token minted at session creation, the timestamp of the last
//! checkout attempt (for the resubmit throttle), a discount code applied
//! earlier in the visit, and the post-login return target. Sessions start
//! anonymous and are bound to a user at sign-in.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct SessionData {
  pub user_id: Option<Uuid>,
  pub csrf_token: String,
  pub last_checkout_attempt: Option<DateTime<Utc>>,
  pub pending_discount_code: Option<String>,
  pub return_to: Option<String>,
}

#[derive(Default)]
pub struct SessionStore {
  inner: RwLock<HashMap<String, SessionData>>,
}

fn new_token() -> String {
  Uuid::new_v4().simple().to_string()
}

impl SessionStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Creates an anonymous session (no user yet) and returns its token.
  pub fn create_anonymous(&self) -> (String, SessionData) {
    self.insert(None)
  }

  /// Creates a session already bound to `user_id` and returns its token.
  pub fn create_for_user(&self, user_id: Uuid) -> (String, SessionData) {
    self.insert(Some(user_id))
  }

  fn insert(&self, user_id: Option<Uuid>) -> (String, SessionData) {
    let token = new_token();
    let data = SessionData {
      user_id,
      csrf_token: new_token(),
      last_checkout_attempt: None,
      pending_discount_code: None,
      return_to: None,
    };
    self.inner.write().insert(token.clone(), data.clone());
    (token, data)
  }

  pub fn get(&self, token: &str) -> Option<SessionData> {
    self.inner.read().get(token).cloned()
  }

  pub fn destroy(&self, token: &str) {
    self.inner.write().remove(token);
  }

  pub fn set_return_to(&self, token: &str, target: Option<String>) {
    if let Some(session) = self.inner.write().get_mut(token) {
      session.return_to = target;
    }
  }

  /// Removes and returns the stored post-login target, if any.
  pub fn take_return_to(&self, token: &str) -> Option<String> {
    self.inner.write().get_mut(token).and_then(|s| s.return_to.take())
  }

  pub fn set_pending_discount(&self, token: &str, code: Option<String>) {
    if let Some(session) = self.inner.write().get_mut(token) {
      session.pending_discount_code = code;
    }
  }

  /// Records a checkout attempt at `now` and returns the previous attempt
  /// timestamp. Read-and-replace happens under one write lock so two
  /// near-simultaneous submissions from the same session cannot both see
  /// an empty slot.
  pub fn record_checkout_attempt(&self, token: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    self
      .inner
      .write()
      .get_mut(token)
      .and_then(|s| s.last_checkout_attempt.replace(now))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::Duration;

  #[test]
  fn anonymous_session_binds_no_user_and_has_csrf_token() {
    let store = SessionStore::new();
    let (token, data) = store.create_anonymous();
    assert!(data.user_id.is_none());
    assert!(!data.csrf_token.is_empty());
    assert_eq!(store.get(&token).unwrap().csrf_token, data.csrf_token);
  }

  #[test]
  fn record_checkout_attempt_returns_previous_timestamp() {
    let store = SessionStore::new();
    let (token, _) = store.create_for_user(Uuid::new_v4());

    let first = Utc::now();
    assert!(store.record_checkout_attempt(&token, first).is_none());

    let second = first + Duration::seconds(2);
    let previous = store.record_checkout_attempt(&token, second).unwrap();
    assert_eq!(previous, first);
  }

  #[test]
  fn return_to_is_taken_once() {
    let store = SessionStore::new();
    let (token, _) = store.create_anonymous();
    store.set_return_to(&token, Some("/checkout".to_string()));
    assert_eq!(store.take_return_to(&token).as_deref(), Some("/checkout"));
    assert!(store.take_return_to(&token).is_none());
  }

  #[test]
  fn unknown_token_is_ignored() {
    let store = SessionStore::new();
    assert!(store.get("missing").is_none());
    assert!(store.record_checkout_attempt("missing", Utc::now()).is_none());
  }
}
