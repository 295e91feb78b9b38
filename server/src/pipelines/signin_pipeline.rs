// server/src/pipelines/signin_pipeline.rs

use crate::errors::AppError;
use crate::models::User;
use crate::pipelines::contexts::SigninCtxData;
use crate::services::auth;
use crate::state::AppState;
use conductor::{Conductor, ContextData, Pipeline, PipelineControl};
use std::sync::Arc;
use tracing::{event, info, warn, Level};

/// Registers the user sign-in pipeline.
pub fn register_signin_pipeline(conductor: &Arc<Conductor<AppError>>, _app_state: &AppState) {
  let mut signin_p = Pipeline::<SigninCtxData, AppError>::new(&[
    ("validate_signin_input", false, None),
    ("fetch_user_by_email_signin", false, None),
    ("verify_user_password_signin", false, None),
    ("issue_session_token_signin", false, None),
  ]);

  // Step 1: Validate input
  signin_p.on_root("validate_signin_input", |ctx_data: ContextData<SigninCtxData>| {
    Box::pin(async move {
      let (email_val, password_is_empty_val) = {
        let guard = ctx_data.read();
        (guard.email.clone(), guard.password.is_empty())
      };

      event!(Level::DEBUG, email = %email_val, "Validating sign-in input.");
      if email_val.is_empty() || !email_val.contains('@') {
        warn!("Invalid email format provided for sign-in.");
        return Err(AppError::Validation("Valid email is required.".to_string()));
      }
      if password_is_empty_val {
        warn!("Empty password provided for sign-in.");
        return Err(AppError::Validation("Password is required.".to_string()));
      }
      Ok(PipelineControl::Continue)
    })
  });

  // Step 2: Fetch user by email
  signin_p.on_root("fetch_user_by_email_signin", |ctx_data: ContextData<SigninCtxData>| {
    Box::pin(async move {
      let (email_val, db_pool_clone) = {
        let guard = ctx_data.read();
        (guard.email.clone(), guard.app_state.db_pool.clone())
      };

      event!(Level::DEBUG, email = %email_val, "Fetching user by email for signin.");

      match sqlx::query_as::<_, User>(
        "SELECT id, email, password_hash, full_name, created_at, updated_at FROM users WHERE email = $1",
      )
      .bind(&email_val)
      .fetch_optional(&db_pool_clone)
      .await
      {
        Ok(Some(user)) => {
          {
            let mut guard = ctx_data.write();
            guard.user_id = Some(user.id);
            guard.user_email_for_response = Some(user.email.clone());
            guard.temp_password_hash = Some(user.password_hash); // For the next step only
          }
          event!(Level::INFO, user_id = %user.id, "User found for signin.");
          Ok(PipelineControl::Continue)
        }
        Ok(None) => {
          warn!("User not found for email during signin: {}", email_val);
          Err(AppError::Auth("Invalid email or password.".to_string()))
        }
        Err(sqlx_error) => {
          event!(Level::ERROR, error = %sqlx_error, "Database error while fetching user for signin.");
          Err(AppError::Sqlx(sqlx_error))
        }
      }
    })
  });

  // Step 3: Verify password
  signin_p.on_root("verify_user_password_signin", |ctx_data: ContextData<SigninCtxData>| {
    Box::pin(async move {
      let (stored_hash_opt, password_val, user_id_opt) = {
        let guard = ctx_data.read();
        (guard.temp_password_hash.clone(), guard.password.clone(), guard.user_id)
      };

      let stored_hash = match stored_hash_opt {
        Some(hash) => hash,
        None => {
          event!(Level::ERROR, "Password hash missing in context for verification.");
          return Err(AppError::Internal(
            "Password hash unexpectedly missing for verification.".to_string(),
          ));
        }
      };

      match auth::verify_password(&stored_hash, &password_val) {
        Ok(true) => {
          event!(Level::INFO, user_id = ?user_id_opt, "Password verified successfully for signin.");
          {
            ctx_data.write().temp_password_hash = None;
          }
          Ok(PipelineControl::Continue)
        }
        Ok(false) => {
          warn!("Password mismatch for user_id (signin): {:?}", user_id_opt);
          {
            ctx_data.write().temp_password_hash = None;
          }
          Err(AppError::Auth("Invalid email or password.".to_string()))
        }
        Err(app_auth_err) => {
          event!(Level::ERROR, error = %app_auth_err, "Error during password verification logic for signin.");
          {
            ctx_data.write().temp_password_hash = None;
          }
          Err(app_auth_err)
        }
      }
    })
  });

  // Step 4: Issue a session bound to the user
  signin_p.on_root("issue_session_token_signin", |ctx_data: ContextData<SigninCtxData>| {
    Box::pin(async move {
      let (sessions, user_id_opt) = {
        let guard = ctx_data.read();
        (guard.app_state.sessions.clone(), guard.user_id)
      };
      let Some(user_id) = user_id_opt else {
        return Err(AppError::Internal("User ID missing before session issuance.".to_string()));
      };

      let (token, _session) = sessions.create_for_user(user_id);
      {
        ctx_data.write().session_token = Some(token);
      }
      event!(Level::INFO, user_id = %user_id, "Session token issued.");
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  conductor.register_pipeline(signin_p);
  info!("Sign-in pipeline registered.");
}
