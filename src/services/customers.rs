use std::sync::Arc;

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::auth::{generate_token, hash_password, token_expired, verify_password};
use crate::db::DbPool;
use crate::entities::customer::{self, Entity as CustomerEntity, Model as CustomerModel};
use crate::entities::customer_token;
use crate::errors::ServiceError;
use crate::services::managers::{LoginRequest, TokenResponse};

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct RegisterCustomerRequest {
    #[validate(length(min = 1, max = 255, message = "Customer name is required"))]
    pub name: String,
    #[validate(length(min = 3, max = 32, message = "Phone must be between 3 and 32 characters"))]
    pub phone: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct UpdateCustomerRequest {
    #[validate(length(min = 1, max = 255, message = "Customer name is required"))]
    pub name: Option<String>,
    #[validate(length(min = 3, max = 32, message = "Phone must be between 3 and 32 characters"))]
    pub phone: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ValidateTokenRequest {
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CustomerResponse {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Service for customer accounts.
#[derive(Clone)]
pub struct CustomerService {
    db_pool: Arc<DbPool>,
}

impl CustomerService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self, request), fields(phone = %request.phone))]
    pub async fn register(
        &self,
        request: RegisterCustomerRequest,
    ) -> Result<CustomerResponse, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        let db = &*self.db_pool;
        let customer_id = Uuid::new_v4();

        let insert = customer::ActiveModel {
            id: Set(customer_id),
            name: Set(request.name),
            phone: Set(request.phone),
            password_hash: Set(hash_password(&request.password)?),
            is_active: Set(true),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        }
        .insert(db)
        .await;

        match insert {
            Ok(model) => {
                info!(customer_id = %customer_id, "customer registered");
                Ok(model_to_response(model))
            }
            Err(err) => {
                if matches!(
                    err.sql_err(),
                    Some(sea_orm::SqlErr::UniqueConstraintViolation(_))
                ) {
                    return Err(ServiceError::Conflict(
                        "phone already registered".to_string(),
                    ));
                }
                Err(ServiceError::DatabaseError(err))
            }
        }
    }

    /// Exchanges phone + password for a customer token. Blocked accounts
    /// cannot log in.
    #[instrument(skip(self, request), fields(phone = %request.phone))]
    pub async fn login(&self, request: LoginRequest) -> Result<TokenResponse, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        let db = &*self.db_pool;

        let account = CustomerEntity::find()
            .filter(customer::Column::Phone.eq(request.phone.clone()))
            .one(db)
            .await?
            .ok_or_else(|| {
                warn!("login attempt for unknown customer phone");
                ServiceError::AuthError("invalid phone or password".to_string())
            })?;

        if !account.is_active {
            return Err(ServiceError::AuthError("account is blocked".to_string()));
        }
        if !verify_password(&request.password, &account.password_hash)? {
            return Err(ServiceError::AuthError(
                "invalid phone or password".to_string(),
            ));
        }

        let token = generate_token();
        customer_token::ActiveModel {
            token: Set(token.clone()),
            customer_id: Set(account.id),
            created_at: Set(Utc::now()),
        }
        .insert(db)
        .await?;

        Ok(TokenResponse { token })
    }

    /// Resolves a customer token to its account. Expired tokens and blocked
    /// accounts are rejected.
    #[instrument(skip(self, token))]
    pub async fn validate_token(
        &self,
        token: &str,
        ttl_secs: i64,
    ) -> Result<CustomerResponse, ServiceError> {
        let db = &*self.db_pool;

        let record = customer_token::Entity::find_by_id(token.to_string())
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::AuthError("invalid token".to_string()))?;

        if token_expired(record.created_at, ttl_secs, Utc::now()) {
            return Err(ServiceError::AuthError("token expired".to_string()));
        }

        let account = CustomerEntity::find_by_id(record.customer_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::AuthError("invalid token".to_string()))?;

        if !account.is_active {
            return Err(ServiceError::AuthError("account is blocked".to_string()));
        }

        Ok(model_to_response(account))
    }

    #[instrument(skip(self), fields(customer_id = %customer_id))]
    pub async fn get_customer(&self, customer_id: Uuid) -> Result<CustomerResponse, ServiceError> {
        let db = &*self.db_pool;

        let model = CustomerEntity::find_by_id(customer_id)
            .one(db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Customer {} not found", customer_id))
            })?;

        Ok(model_to_response(model))
    }

    /// Lists customers ordered by creation time, newest first.
    #[instrument(skip(self))]
    pub async fn list_customers(
        &self,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<CustomerResponse>, u64), ServiceError> {
        let db = &*self.db_pool;

        let paginator = CustomerEntity::find()
            .order_by_desc(customer::Column::CreatedAt)
            .paginate(db, limit.max(1));

        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok((items.into_iter().map(model_to_response).collect(), total))
    }

    /// Lists active customers only; blocked accounts are skipped.
    #[instrument(skip(self))]
    pub async fn list_active_customers(
        &self,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<CustomerResponse>, u64), ServiceError> {
        let db = &*self.db_pool;

        let paginator = CustomerEntity::find()
            .filter(customer::Column::IsActive.eq(true))
            .order_by_desc(customer::Column::CreatedAt)
            .paginate(db, limit.max(1));

        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok((items.into_iter().map(model_to_response).collect(), total))
    }

    #[instrument(skip(self, request), fields(customer_id = %customer_id))]
    pub async fn update_customer(
        &self,
        customer_id: Uuid,
        request: UpdateCustomerRequest,
    ) -> Result<CustomerResponse, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        let db = &*self.db_pool;

        let existing = CustomerEntity::find_by_id(customer_id)
            .one(db)
            .await?
            .ok_or_else(|| {
                warn!(customer_id = %customer_id, "customer not found for update");
                ServiceError::NotFound(format!("Customer {} not found", customer_id))
            })?;

        let mut active_model: customer::ActiveModel = existing.into();
        if let Some(name) = request.name {
            active_model.name = Set(name);
        }
        if let Some(phone) = request.phone {
            active_model.phone = Set(phone);
        }
        active_model.updated_at = Set(Some(Utc::now()));

        let update = active_model.update(db).await;
        match update {
            Ok(model) => {
                info!(customer_id = %customer_id, "customer updated");
                Ok(model_to_response(model))
            }
            Err(err) => {
                if matches!(
                    err.sql_err(),
                    Some(sea_orm::SqlErr::UniqueConstraintViolation(_))
                ) {
                    return Err(ServiceError::Conflict(
                        "phone already registered".to_string(),
                    ));
                }
                Err(ServiceError::DatabaseError(err))
            }
        }
    }

    /// Blocks or unblocks a customer account. Blocked customers keep their
    /// sale history but cannot log in.
    #[instrument(skip(self), fields(customer_id = %customer_id, active = active))]
    pub async fn set_active(
        &self,
        customer_id: Uuid,
        active: bool,
    ) -> Result<CustomerResponse, ServiceError> {
        let db = &*self.db_pool;

        let existing = CustomerEntity::find_by_id(customer_id)
            .one(db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Customer {} not found", customer_id))
            })?;

        let mut active_model: customer::ActiveModel = existing.into();
        active_model.is_active = Set(active);
        active_model.updated_at = Set(Some(Utc::now()));

        let model = active_model.update(db).await?;

        info!(customer_id = %customer_id, active = active, "customer active flag changed");

        Ok(model_to_response(model))
    }

    #[instrument(skip(self), fields(customer_id = %customer_id))]
    pub async fn remove_customer(&self, customer_id: Uuid) -> Result<(), ServiceError> {
        let db = &*self.db_pool;

        let result = CustomerEntity::delete_by_id(customer_id).exec(db).await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!(
                "Customer {} not found",
                customer_id
            )));
        }

        info!(customer_id = %customer_id, "customer removed");
        Ok(())
    }
}

fn model_to_response(model: CustomerModel) -> CustomerResponse {
    CustomerResponse {
        id: model.id,
        name: model.name,
        phone: model.phone,
        is_active: model.is_active,
        created_at: model.created_at,
        updated_at: model.updated_at,
    }
}
