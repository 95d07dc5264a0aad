//! Token-based authentication for manager and customer accounts.
//!
//! Tokens are opaque random strings persisted alongside the account they
//! belong to; the middleware resolves `Authorization: Bearer <token>` to an
//! [`AuthManager`] request extension. Passwords are hashed with Argon2.

use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, SaltString};
use argon2::{Argon2, PasswordVerifier};
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Duration, Utc};
use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use sea_orm::EntityTrait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::{manager, manager_token};
use crate::errors::ServiceError;
use crate::AppState;

/// Length of issued tokens (alphanumeric characters).
const TOKEN_LEN: usize = 64;

/// Authenticated manager resolved from a bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthManager {
    pub manager_id: Uuid,
    pub is_admin: bool,
}

impl AuthManager {
    /// Errors unless the manager holds the admin flag.
    pub fn require_admin(&self) -> Result<(), ServiceError> {
        if self.is_admin {
            Ok(())
        } else {
            Err(ServiceError::Forbidden(
                "admin privileges required".to_string(),
            ))
        }
    }
}

/// Generate a fresh opaque token.
pub fn generate_token() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LEN)
        .map(char::from)
        .collect()
}

/// Hash a password with Argon2 and a per-password salt.
pub fn hash_password(password: &str) -> Result<String, ServiceError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ServiceError::InternalError(format!("password hashing failed: {}", e)))
}

/// Verify a password against a stored Argon2 hash.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, ServiceError> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| ServiceError::InternalError(format!("stored hash is malformed: {}", e)))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// Whether a token issued at `created_at` has outlived `ttl_secs`.
pub fn token_expired(created_at: DateTime<Utc>, ttl_secs: i64, now: DateTime<Utc>) -> bool {
    now - created_at > Duration::seconds(ttl_secs)
}

fn bearer_token(request: &Request) -> Option<&str> {
    let value = request.headers().get(header::AUTHORIZATION)?.to_str().ok()?;
    // Accept both "Bearer <token>" and a bare token value.
    Some(value.strip_prefix("Bearer ").unwrap_or(value).trim())
}

/// Middleware guarding manager-facing routes. Resolves the bearer token to a
/// manager and stores [`AuthManager`] in the request extensions.
pub async fn require_manager(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ServiceError> {
    let token = bearer_token(&request)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ServiceError::AuthError("missing bearer token".to_string()))?
        .to_string();

    let record = manager_token::Entity::find_by_id(token)
        .one(&*state.db)
        .await?
        .ok_or_else(|| ServiceError::AuthError("invalid token".to_string()))?;

    if token_expired(record.created_at, state.config.token_ttl_secs, Utc::now()) {
        return Err(ServiceError::AuthError("token expired".to_string()));
    }

    let account = manager::Entity::find_by_id(record.manager_id)
        .one(&*state.db)
        .await?
        .ok_or_else(|| ServiceError::AuthError("invalid token".to_string()))?;

    request.extensions_mut().insert(AuthManager {
        manager_id: account.id,
        is_admin: account.is_admin,
    });

    Ok(next.run(request).await)
}
