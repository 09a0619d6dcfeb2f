//! Registration, login, and bearer-token authentication.
//!
//! Access tokens are stateless HS256 JWTs carrying the user id; nothing is
//! stored server-side. Tokens have no expiry unless `auth.token_expiry_days`
//! is configured.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    async_trait,
    extract::{FromRequestParts, State},
    http::{request::Parts, StatusCode},
    Json,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::db::{LoginRequest, LoginResponse, RegisterRequest, User, UserResponse};
use crate::AppState;

use super::error::{ApiError, ValidationErrorBuilder};
use super::validation::{validate_email, validate_password, validate_username};

/// JWT claims carried by an access token.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject - the user id
    pub sub: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration (Unix timestamp); absent for non-expiring tokens
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2.hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Verify a password against a hash
pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

/// Issue an access token for a user
pub fn issue_token(auth: &AuthConfig, user_id: &str) -> Result<String, ApiError> {
    let now = Utc::now();
    let claims = Claims {
        sub: user_id.to_string(),
        iat: now.timestamp(),
        exp: auth
            .token_expiry_days
            .map(|days| (now + Duration::days(days)).timestamp()),
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(auth.jwt_secret.as_bytes()),
    )
    .map_err(|e| ApiError::internal(format!("Failed to issue token: {e}")))
}

/// Decode and verify an access token
pub fn decode_token(auth: &AuthConfig, token: &str) -> Result<Claims, ApiError> {
    let mut validation = Validation::new(Algorithm::HS256);
    // `exp` is optional: tokens without one never expire.
    validation.set_required_spec_claims::<&str>(&[]);

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(auth.jwt_secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|err| match err.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
            ApiError::unauthorized("Token has expired")
        }
        _ => ApiError::unauthorized("Invalid token"),
    })
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub message: String,
    pub user: UserResponse,
}

/// Register a new account
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    let mut errors = ValidationErrorBuilder::new();
    if let Err(e) = validate_username(&request.username) {
        errors.add("username", e);
    }
    if let Err(e) = validate_email(&request.email) {
        errors.add("email", e);
    }
    if let Err(e) = validate_password(&request.password) {
        errors.add("password", e);
    }
    errors.finish()?;

    let taken: Option<(String,)> = sqlx::query_as("SELECT id FROM users WHERE username = ?")
        .bind(&request.username)
        .fetch_optional(&state.db)
        .await?;
    if taken.is_some() {
        return Err(ApiError::bad_request("Username already exists"));
    }

    let taken: Option<(String,)> = sqlx::query_as("SELECT id FROM users WHERE email = ?")
        .bind(&request.email)
        .fetch_optional(&state.db)
        .await?;
    if taken.is_some() {
        return Err(ApiError::bad_request("Email already exists"));
    }

    let id = Uuid::new_v4().to_string();
    let now = Utc::now();
    let password_hash = hash_password(&request.password)
        .map_err(|e| ApiError::internal(format!("Failed to hash password: {e}")))?;

    sqlx::query(
        "INSERT INTO users (id, username, email, password_hash, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(&request.username)
    .bind(&request.email)
    .bind(&password_hash)
    .bind(now)
    .bind(now)
    .execute(&state.db)
    .await?;

    tracing::info!("Registered user {}", request.username);

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "User registered successfully".to_string(),
            user: UserResponse {
                id,
                username: request.username,
                email: request.email,
            },
        }),
    ))
}

/// Login endpoint
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    if request.username.is_empty() || request.password.is_empty() {
        return Err(ApiError::bad_request("Missing username or password"));
    }

    let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE username = ?")
        .bind(&request.username)
        .fetch_optional(&state.db)
        .await?;

    let user = user.ok_or_else(|| ApiError::unauthorized("Invalid credentials"))?;

    if !verify_password(&request.password, &user.password_hash) {
        return Err(ApiError::unauthorized("Invalid credentials"));
    }

    let access_token = issue_token(&state.config.auth, &user.id)?;

    Ok(Json(LoginResponse {
        message: "Login successful".to_string(),
        access_token,
        user: UserResponse::from(user),
    }))
}

/// Extract the bearer token from request headers
fn extract_token(headers: &axum::http::HeaderMap) -> Option<&str> {
    headers
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
}

/// Get the current user from a token
pub async fn get_current_user(
    pool: &sqlx::SqlitePool,
    auth: &AuthConfig,
    token: &str,
) -> Result<User, ApiError> {
    let claims = decode_token(auth, token)?;

    let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = ?")
        .bind(&claims.sub)
        .fetch_optional(pool)
        .await?;

    user.ok_or_else(|| ApiError::unauthorized("Invalid token"))
}

/// Extractor for getting the current authenticated user from a request
#[async_trait]
impl FromRequestParts<Arc<AppState>> for User {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_token(&parts.headers)
            .ok_or_else(|| ApiError::unauthorized("Missing authorization header"))?;
        get_current_user(&state.db, &state.config.auth, token).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::test_state;

    fn test_auth_config() -> AuthConfig {
        AuthConfig {
            jwt_secret: "test-secret".to_string(),
            token_expiry_days: None,
        }
    }

    fn register_request(username: &str) -> Json<RegisterRequest> {
        Json(RegisterRequest {
            username: username.to_string(),
            email: format!("{username}@example.com"),
            password: "hunter22".to_string(),
        })
    }

    #[test]
    fn password_hash_roundtrip() {
        let hash = hash_password("hunter22").unwrap();
        assert!(verify_password("hunter22", &hash));
        assert!(!verify_password("hunter23", &hash));
        assert!(!verify_password("hunter22", "not-a-hash"));
    }

    #[test]
    fn token_roundtrip_without_expiry() {
        let auth = test_auth_config();
        let token = issue_token(&auth, "user-1").unwrap();
        let claims = decode_token(&auth, &token).unwrap();
        assert_eq!(claims.sub, "user-1");
        assert!(claims.exp.is_none());
    }

    #[test]
    fn token_with_wrong_secret_is_rejected() {
        let auth = test_auth_config();
        let token = issue_token(&auth, "user-1").unwrap();

        let other = AuthConfig {
            jwt_secret: "other-secret".to_string(),
            token_expiry_days: None,
        };
        assert!(decode_token(&other, &token).is_err());
    }

    #[test]
    fn token_expiry_is_stamped_when_configured() {
        let auth = AuthConfig {
            jwt_secret: "test-secret".to_string(),
            token_expiry_days: Some(7),
        };
        let token = issue_token(&auth, "user-1").unwrap();
        let claims = decode_token(&auth, &token).unwrap();
        assert!(claims.exp.unwrap() > Utc::now().timestamp());
    }

    #[tokio::test]
    async fn register_then_login() {
        let state = test_state().await;

        let (status, Json(registered)) =
            register(State(state.clone()), register_request("alice")).await.unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(registered.user.username, "alice");

        let Json(session) = login(
            State(state.clone()),
            Json(LoginRequest {
                username: "alice".to_string(),
                password: "hunter22".to_string(),
            }),
        )
        .await
        .unwrap();

        let claims = decode_token(&state.config.auth, &session.access_token).unwrap();
        assert_eq!(claims.sub, registered.user.id);
    }

    #[tokio::test]
    async fn login_with_wrong_password_is_unauthorized() {
        let state = test_state().await;
        register(State(state.clone()), register_request("bob")).await.unwrap();

        let err = login(
            State(state),
            Json(LoginRequest {
                username: "bob".to_string(),
                password: "wrong-password".to_string(),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn duplicate_username_is_rejected() {
        let state = test_state().await;
        register(State(state.clone()), register_request("carol")).await.unwrap();

        let err = register(State(state), register_request("carol")).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn short_password_is_rejected() {
        let state = test_state().await;
        let err = register(
            State(state),
            Json(RegisterRequest {
                username: "dave".to_string(),
                email: "dave@example.com".to_string(),
                password: "short".to_string(),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }
}
