// server/src/web/handlers/auth_handlers.rs

use actix_web::cookie::Cookie;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};

use crate::errors::AppError;
use crate::pipelines::contexts::{SigninCtxData, SignupCtxData};
use crate::state::AppState;
use crate::web::extractors::{MaybeSession, SESSION_COOKIE};
use conductor::{ContextData, PipelineResult};

// --- Request DTOs ---

#[derive(Deserialize, Debug)]
pub struct SignupRequestPayload {
  pub email: String,
  pub password: String,
  #[serde(default)]
  pub full_name: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct SigninRequestPayload {
  pub email: String,
  pub password: String,
  #[serde(default)]
  pub return_to: Option<String>,
}

fn session_cookie(token: &str) -> Cookie<'static> {
  Cookie::build(SESSION_COOKIE, token.to_string())
    .path("/")
    .http_only(true)
    .finish()
}

// --- Handlers ---

/// Minimal login endpoint for redirect targets; the storefront page
/// itself is rendered client-side.
#[instrument(name = "handler::login_page", skip_all)]
pub async fn login_page_handler() -> HttpResponse {
  HttpResponse::Ok().json(json!({"message": "Please sign in to continue."}))
}

#[instrument(name = "handler::signup", skip_all, fields(req_email = %req_payload.email))]
pub async fn signup_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<SignupRequestPayload>,
) -> Result<HttpResponse, AppError> {
  let payload = req_payload.into_inner();
  let ctx = ContextData::new(SignupCtxData {
    app_state: app_state.get_ref().clone(),
    email: payload.email.clone(),
    password: payload.password,
    full_name: payload.full_name,
    created_user_id: None,
    session_token: None,
  });

  match app_state.conductor.run(ctx.clone()).await {
    Ok(PipelineResult::Completed) => {
      let (user_id, token) = {
        let guard = ctx.read();
        (guard.created_user_id, guard.session_token.clone())
      };
      let user_id = user_id.ok_or_else(|| {
        warn!("Signup pipeline completed but user_id was not set.");
        AppError::Internal("Signup completed without creating a user.".to_string())
      })?;
      let token = token.ok_or_else(|| {
        warn!("Signup pipeline completed but no session was issued.");
        AppError::Internal("Signup completed without a session.".to_string())
      })?;

      info!(user_id = %user_id, "Signup successful.");
      Ok(
        HttpResponse::Created().cookie(session_cookie(&token)).json(json!({
          "message": "Account created successfully.",
          "userId": user_id.to_string(),
          "email": payload.email,
          "token": token,
        })),
      )
    }
    Ok(PipelineResult::Stopped) => {
      warn!("Signup pipeline was stopped by a handler.");
      Err(AppError::Internal("Signup was halted before completion.".to_string()))
    }
    Err(app_err) => Err(app_err),
  }
}

#[instrument(name = "handler::signin", skip_all, fields(req_email = %req_payload.email))]
pub async fn signin_handler(
  app_state: web::Data<AppState>,
  maybe_session: MaybeSession,
  req_payload: web::Json<SigninRequestPayload>,
) -> Result<HttpResponse, AppError> {
  let payload = req_payload.into_inner();
  let ctx = ContextData::new(SigninCtxData {
    app_state: app_state.get_ref().clone(),
    email: payload.email.clone(),
    password: payload.password,
    temp_password_hash: None,
    user_id: None,
    session_token: None,
    user_email_for_response: None,
  });

  match app_state.conductor.run(ctx.clone()).await {
    Ok(PipelineResult::Completed) => {
      let (user_id, token, user_email) = {
        let guard = ctx.read();
        (guard.user_id, guard.session_token.clone(), guard.user_email_for_response.clone())
      };
      let user_id = user_id.ok_or_else(|| AppError::Auth("Signin completed without user identification.".to_string()))?;
      let token = token.ok_or_else(|| AppError::Auth("Signin completed without a session.".to_string()))?;

      // Honor a return target stamped onto the pre-login session (e.g.
      // checkout bounced the visitor here), then retire that session.
      let redirect_to = maybe_session
        .token
        .as_deref()
        .and_then(|old_token| {
          let target = app_state.sessions.take_return_to(old_token);
          app_state.sessions.destroy(old_token);
          target
        })
        .or(payload.return_to)
        .unwrap_or_else(|| "/".to_string());

      info!(user_id = %user_id, redirect_to = %redirect_to, "Signin successful.");
      Ok(HttpResponse::Ok().cookie(session_cookie(&token)).json(json!({
        "message": "Signin successful.",
        "userId": user_id.to_string(),
        "email": user_email.unwrap_or_default(),
        "token": token,
        "redirectTo": redirect_to,
      })))
    }
    Ok(PipelineResult::Stopped) => {
      warn!("Signin pipeline was stopped by a handler.");
      Err(AppError::Auth("Authentication process was unexpectedly halted.".to_string()))
    }
    Err(app_err) => Err(app_err),
  }
}
