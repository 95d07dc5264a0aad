use std::sync::Arc;

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::auth::{generate_token, hash_password, verify_password};
use crate::db::DbPool;
use crate::entities::{manager, manager_token};
use crate::errors::ServiceError;

/// Role string that grants the admin flag at registration.
pub const ADMIN_ROLE: &str = "ADMIN";

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct RegisterManagerRequest {
    #[validate(length(min = 1, max = 255, message = "Manager name is required"))]
    pub name: String,
    #[validate(length(min = 3, max = 32, message = "Phone must be between 3 and 32 characters"))]
    pub phone: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    #[serde(default)]
    pub roles: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 3, max = 32, message = "Phone must be between 3 and 32 characters"))]
    pub phone: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

/// Service for manager accounts and their login tokens. Token expiry is
/// enforced at authentication time, not at issuance.
#[derive(Clone)]
pub struct ManagerService {
    db_pool: Arc<DbPool>,
}

impl ManagerService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Registers a manager and issues an initial token. Only reachable
    /// through admin-guarded routes.
    #[instrument(skip(self, request), fields(phone = %request.phone))]
    pub async fn register(
        &self,
        request: RegisterManagerRequest,
    ) -> Result<TokenResponse, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        let db = &*self.db_pool;
        let is_admin = request.roles.iter().any(|role| role == ADMIN_ROLE);
        let manager_id = Uuid::new_v4();

        let insert = manager::ActiveModel {
            id: Set(manager_id),
            name: Set(request.name),
            phone: Set(request.phone),
            password_hash: Set(hash_password(&request.password)?),
            is_admin: Set(is_admin),
            created_at: Set(Utc::now()),
        }
        .insert(db)
        .await;

        if let Err(err) = insert {
            if matches!(
                err.sql_err(),
                Some(sea_orm::SqlErr::UniqueConstraintViolation(_))
            ) {
                return Err(ServiceError::Conflict(
                    "phone already registered".to_string(),
                ));
            }
            return Err(ServiceError::DatabaseError(err));
        }

        info!(manager_id = %manager_id, is_admin = is_admin, "manager registered");

        self.issue_token(manager_id).await
    }

    /// Exchanges phone + password for a fresh token.
    #[instrument(skip(self, request), fields(phone = %request.phone))]
    pub async fn login(&self, request: LoginRequest) -> Result<TokenResponse, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        let db = &*self.db_pool;

        let account = manager::Entity::find()
            .filter(manager::Column::Phone.eq(request.phone.clone()))
            .one(db)
            .await?
            .ok_or_else(|| {
                warn!("login attempt for unknown manager phone");
                ServiceError::AuthError("invalid phone or password".to_string())
            })?;

        if !verify_password(&request.password, &account.password_hash)? {
            return Err(ServiceError::AuthError(
                "invalid phone or password".to_string(),
            ));
        }

        self.issue_token(account.id).await
    }

    async fn issue_token(&self, manager_id: Uuid) -> Result<TokenResponse, ServiceError> {
        let db = &*self.db_pool;
        let token = generate_token();

        manager_token::ActiveModel {
            token: Set(token.clone()),
            manager_id: Set(manager_id),
            created_at: Set(Utc::now()),
        }
        .insert(db)
        .await?;

        Ok(TokenResponse { token })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_role_string_is_detected() {
        let request = RegisterManagerRequest {
            name: "Ada".into(),
            phone: "+100200".into(),
            password: "hunter22".into(),
            roles: vec!["SALES".into(), ADMIN_ROLE.into()],
        };
        assert!(request.roles.iter().any(|r| r == ADMIN_ROLE));
        assert!(request.validate().is_ok());
    }

    #[test]
    fn short_password_fails_validation() {
        let request = RegisterManagerRequest {
            name: "Ada".into(),
            phone: "+100200".into(),
            password: "abc".into(),
            roles: vec![],
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn login_request_requires_password() {
        let request = LoginRequest {
            phone: "+100200".into(),
            password: String::new(),
        };
        assert!(request.validate().is_err());
    }
}
