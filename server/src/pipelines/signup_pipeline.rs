// server/src/pipelines/signup_pipeline.rs

use crate::errors::AppError;
use crate::models::User;
use crate::pipelines::contexts::SignupCtxData;
use crate::services::auth;
use crate::state::AppState;
use conductor::{Conductor, ContextData, Pipeline, PipelineControl};
use std::sync::Arc;
use tracing::{event, info, warn, Level};
use uuid::Uuid;

/// Registers the user sign-up pipeline.
pub fn register_signup_pipeline(conductor: &Arc<Conductor<AppError>>, _app_state: &AppState) {
  let mut signup_p = Pipeline::<SignupCtxData, AppError>::new(&[
    ("validate_signup_input", false, None),
    ("check_existing_user_signup", false, None),
    ("create_user_in_db", false, None),
    ("issue_session_token_signup", false, None),
  ]);

  // Step 1: Validate input
  signup_p.on_root("validate_signup_input", |ctx_data: ContextData<SignupCtxData>| {
    Box::pin(async move {
      let (email_val, password_len_val) = {
        let guard = ctx_data.read();
        (guard.email.clone(), guard.password.len())
      };

      event!(Level::DEBUG, email = %email_val, "Validating signup input.");
      if !validator::validate_email(&email_val) {
        warn!("Invalid email format provided for signup.");
        return Err(AppError::Validation("Valid email is required.".to_string()));
      }
      if password_len_val < 8 {
        warn!("Password too short for signup ({} chars).", password_len_val);
        return Err(AppError::Validation(
          "Password must be at least 8 characters long.".to_string(),
        ));
      }
      Ok(PipelineControl::Continue)
    })
  });

  // Step 2: Check if a user with this email already exists
  signup_p.on_root("check_existing_user_signup", |ctx_data: ContextData<SignupCtxData>| {
    Box::pin(async move {
      let (email_val, db_pool_clone) = {
        let guard = ctx_data.read();
        (guard.email.clone(), guard.app_state.db_pool.clone())
      };

      let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
        .bind(&email_val)
        .fetch_one(&db_pool_clone)
        .await?;

      if exists {
        warn!("Attempt to signup with existing email: {}", email_val);
        return Err(AppError::Validation(
          "An account with this email already exists.".to_string(),
        ));
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  // Step 3: Hash the password and create the user row
  signup_p.on_root("create_user_in_db", |ctx_data: ContextData<SignupCtxData>| {
    Box::pin(async move {
      let (email_val, password_val, full_name_val, db_pool_clone) = {
        let guard = ctx_data.read();
        (
          guard.email.clone(),
          guard.password.clone(),
          guard.full_name.clone(),
          guard.app_state.db_pool.clone(),
        )
      };

      let password_hash = auth::hash_password(&password_val)?;

      let user: User = sqlx::query_as(
        "INSERT INTO users (id, email, password_hash, full_name, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, NOW(), NOW()) \
         RETURNING id, email, password_hash, full_name, created_at, updated_at",
      )
      .bind(Uuid::new_v4())
      .bind(&email_val)
      .bind(&password_hash)
      .bind(&full_name_val)
      .fetch_one(&db_pool_clone)
      .await?;

      event!(Level::INFO, user_id = %user.id, "User created.");
      {
        ctx_data.write().created_user_id = Some(user.id);
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  // Step 4: Issue a session bound to the new user
  signup_p.on_root("issue_session_token_signup", |ctx_data: ContextData<SignupCtxData>| {
    Box::pin(async move {
      let (sessions, user_id_opt) = {
        let guard = ctx_data.read();
        (guard.app_state.sessions.clone(), guard.created_user_id)
      };
      let Some(user_id) = user_id_opt else {
        return Err(AppError::Internal("User ID missing before session issuance.".to_string()));
      };

      let (token, _session) = sessions.create_for_user(user_id);
      {
        ctx_data.write().session_token = Some(token);
      }
      event!(Level::INFO, user_id = %user_id, "Session issued for new user.");
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  conductor.register_pipeline(signup_p);
  info!("Sign-up pipeline registered.");
}
