use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::db::DbPool;
use crate::entities::product::{self, Entity as ProductEntity, Model as ProductModel};
use crate::errors::ServiceError;

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateProductRequest {
    #[validate(length(min = 1, max = 255, message = "Product name is required"))]
    pub name: String,
    pub price: Decimal,
    #[validate(range(min = 0, message = "Quantity cannot be negative"))]
    pub quantity: i32,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct UpdateProductRequest {
    #[validate(length(min = 1, max = 255, message = "Product name is required"))]
    pub name: Option<String>,
    pub price: Option<Decimal>,
    #[validate(range(min = 0, message = "Quantity cannot be negative"))]
    pub quantity: Option<i32>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProductResponse {
    pub id: Uuid,
    pub name: String,
    pub price: Decimal,
    pub quantity: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Service for managing the product catalog and its stock counters.
#[derive(Clone)]
pub struct ProductService {
    db_pool: Arc<DbPool>,
}

impl ProductService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create_product(
        &self,
        request: CreateProductRequest,
    ) -> Result<ProductResponse, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;
        if request.price < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Price cannot be negative".to_string(),
            ));
        }

        let db = &*self.db_pool;
        let product_id = Uuid::new_v4();

        let model = product::ActiveModel {
            id: Set(product_id),
            name: Set(request.name),
            price: Set(request.price),
            quantity: Set(request.quantity),
            ..Default::default()
        }
        .insert(db)
        .await?;

        info!(product_id = %product_id, "product created");

        Ok(model_to_response(model))
    }

    #[instrument(skip(self, request), fields(product_id = %product_id))]
    pub async fn update_product(
        &self,
        product_id: Uuid,
        request: UpdateProductRequest,
    ) -> Result<ProductResponse, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;
        if matches!(request.price, Some(p) if p < Decimal::ZERO) {
            return Err(ServiceError::ValidationError(
                "Price cannot be negative".to_string(),
            ));
        }

        let db = &*self.db_pool;

        let existing = ProductEntity::find_by_id(product_id)
            .one(db)
            .await?
            .ok_or_else(|| {
                warn!(product_id = %product_id, "product not found for update");
                ServiceError::NotFound(format!("Product {} not found", product_id))
            })?;

        let mut active_model: product::ActiveModel = existing.into();
        if let Some(name) = request.name {
            active_model.name = Set(name);
        }
        if let Some(price) = request.price {
            active_model.price = Set(price);
        }
        if let Some(quantity) = request.quantity {
            active_model.quantity = Set(quantity);
        }
        if let Some(is_active) = request.is_active {
            active_model.is_active = Set(is_active);
        }

        let updated = active_model.update(db).await?;

        info!(product_id = %product_id, "product updated");

        Ok(model_to_response(updated))
    }

    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn get_product(&self, product_id: Uuid) -> Result<ProductResponse, ServiceError> {
        let db = &*self.db_pool;

        let model = ProductEntity::find_by_id(product_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;

        Ok(model_to_response(model))
    }

    /// Lists active products ordered by creation time, newest first.
    #[instrument(skip(self))]
    pub async fn list_active_products(
        &self,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<ProductResponse>, u64), ServiceError> {
        let db = &*self.db_pool;

        let paginator = ProductEntity::find()
            .filter(product::Column::IsActive.eq(true))
            .order_by_desc(product::Column::CreatedAt)
            .paginate(db, limit.max(1));

        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok((items.into_iter().map(model_to_response).collect(), total))
    }

    /// Removes a product. Products referenced by sale positions cannot be
    /// deleted; deactivate them instead.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn remove_product(&self, product_id: Uuid) -> Result<(), ServiceError> {
        let db = &*self.db_pool;

        let result = ProductEntity::delete_by_id(product_id).exec(db).await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!(
                "Product {} not found",
                product_id
            )));
        }

        info!(product_id = %product_id, "product removed");
        Ok(())
    }
}

fn model_to_response(model: ProductModel) -> ProductResponse {
    ProductResponse {
        id: model.id,
        name: model.name,
        price: model.price,
        quantity: model.quantity,
        is_active: model.is_active,
        created_at: model.created_at,
        updated_at: model.updated_at,
    }
}
