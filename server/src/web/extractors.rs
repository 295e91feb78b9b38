// server/src/web/extractors.rs

//! Request extractors for session-token authentication. The token rides
//! in the `sid` cookie (set at sign-in) or, for non-browser clients, the
//! `X-Session-Token` header.

use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use futures_util::future::{ready, Ready};
use tracing::warn;
use uuid::Uuid;

use crate::errors::AppError;
use crate::services::session::SessionData;
use crate::state::AppState;

pub const SESSION_COOKIE: &str = "sid";
pub const SESSION_HEADER: &str = "X-Session-Token";

pub fn session_token_from_request(req: &HttpRequest) -> Option<String> {
  if let Some(cookie) = req.cookie(SESSION_COOKIE) {
    return Some(cookie.value().to_string());
  }
  req
    .headers()
    .get(SESSION_HEADER)
    .and_then(|v| v.to_str().ok())
    .map(String::from)
}

/// A live session bound to a signed-in user. Fails the request with an
/// auth error otherwise; checkout handlers that want a redirect instead
/// use `MaybeSession` and resolve it themselves.
#[derive(Debug)]
pub struct SessionAuth {
  pub token: String,
  pub user_id: Uuid,
  pub session: SessionData,
}

impl FromRequest for SessionAuth {
  type Error = AppError;
  type Future = Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    let Some(state) = req.app_data::<web::Data<AppState>>() else {
      return ready(Err(AppError::Internal("Application state is not configured.".to_string())));
    };
    let Some(token) = session_token_from_request(req) else {
      return ready(Err(AppError::Auth("Please sign in to continue.".to_string())));
    };
    match state.sessions.get(&token) {
      Some(session) => match session.user_id {
        Some(user_id) => ready(Ok(SessionAuth { token, user_id, session })),
        None => ready(Err(AppError::Auth("Please sign in to continue.".to_string()))),
      },
      None => {
        warn!("Request carried an unknown session token.");
        ready(Err(AppError::Auth(
          "Your session has expired. Please sign in again.".to_string(),
        )))
      }
    }
  }
}

/// The session token as submitted, if any; never fails the request.
#[derive(Debug)]
pub struct MaybeSession {
  pub token: Option<String>,
}

impl FromRequest for MaybeSession {
  type Error = AppError;
  type Future = Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    ready(Ok(MaybeSession {
      token: session_token_from_request(req),
    }))
  }
}
