//! Profile endpoints: read, update, password change.

use axum::{extract::State, Json};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;

use crate::db::{ChangePasswordRequest, UpdateProfileRequest, User, UserResponse};
use crate::AppState;

use super::auth::{hash_password, issue_token, verify_password};
use super::error::{ApiError, ValidationErrorBuilder};
use super::validation::{validate_email, validate_password, validate_username};

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub user: UserResponse,
}

#[derive(Debug, Serialize)]
pub struct UpdateProfileResponse {
    pub message: String,
    pub user: UserResponse,
    /// A fresh token so clients don't keep one minted for stale identity data.
    pub access_token: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

pub async fn get_profile(
    State(_state): State<Arc<AppState>>,
    user: User,
) -> Json<ProfileResponse> {
    Json(ProfileResponse {
        user: UserResponse::from(user),
    })
}

pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    user: User,
    Json(request): Json<UpdateProfileRequest>,
) -> Result<Json<UpdateProfileResponse>, ApiError> {
    let mut errors = ValidationErrorBuilder::new();
    if let Some(ref username) = request.username {
        if let Err(e) = validate_username(username) {
            errors.add("username", e);
        }
    }
    if let Some(ref email) = request.email {
        if let Err(e) = validate_email(email) {
            errors.add("email", e);
        }
    }
    errors.finish()?;

    if let Some(ref username) = request.username {
        if username != &user.username {
            let taken: Option<(String,)> =
                sqlx::query_as("SELECT id FROM users WHERE username = ?")
                    .bind(username)
                    .fetch_optional(&state.db)
                    .await?;
            if taken.is_some() {
                return Err(ApiError::bad_request("Username already exists"));
            }
        }
    }

    if let Some(ref email) = request.email {
        if email != &user.email {
            let taken: Option<(String,)> = sqlx::query_as("SELECT id FROM users WHERE email = ?")
                .bind(email)
                .fetch_optional(&state.db)
                .await?;
            if taken.is_some() {
                return Err(ApiError::bad_request("Email already exists"));
            }
        }
    }

    sqlx::query(
        "UPDATE users SET \
            username = COALESCE(?, username), \
            email = COALESCE(?, email), \
            updated_at = ? \
         WHERE id = ?",
    )
    .bind(&request.username)
    .bind(&request.email)
    .bind(Utc::now())
    .bind(&user.id)
    .execute(&state.db)
    .await?;

    let updated: User = sqlx::query_as("SELECT * FROM users WHERE id = ?")
        .bind(&user.id)
        .fetch_one(&state.db)
        .await?;

    let access_token = issue_token(&state.config.auth, &updated.id)?;

    Ok(Json(UpdateProfileResponse {
        message: "Profile updated successfully".to_string(),
        user: UserResponse::from(updated),
        access_token,
    }))
}

pub async fn change_password(
    State(state): State<Arc<AppState>>,
    user: User,
    Json(request): Json<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    if request.current_password.is_empty() || request.new_password.is_empty() {
        return Err(ApiError::bad_request("Missing required fields"));
    }

    if !verify_password(&request.current_password, &user.password_hash) {
        return Err(ApiError::unauthorized("Current password is incorrect"));
    }

    if let Err(e) = validate_password(&request.new_password) {
        return Err(ApiError::validation_field("new_password", e));
    }

    let password_hash = hash_password(&request.new_password)
        .map_err(|e| ApiError::internal(format!("Failed to hash password: {e}")))?;

    sqlx::query("UPDATE users SET password_hash = ?, updated_at = ? WHERE id = ?")
        .bind(&password_hash)
        .bind(Utc::now())
        .bind(&user.id)
        .execute(&state.db)
        .await?;

    tracing::info!("Password changed for user {}", user.username);

    Ok(Json(MessageResponse {
        message: "Password changed successfully".to_string(),
    }))
}
