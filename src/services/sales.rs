//! Sale recording engine.
//!
//! Records a sale header plus its positions and decrements product stock as
//! one transaction. Stock is reserved per position with a conditional
//! UPDATE (`quantity = quantity - n WHERE is_active AND quantity >= n`), so
//! concurrent sales against the same product serialize at the row and can
//! never oversell. The first position that cannot be reserved aborts the
//! whole sale; nothing is committed on any error path.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, FromQueryResult, QueryFilter,
    QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::db::DbPool;
use crate::entities::{product, sale, sale_position};
use crate::errors::ServiceError;

/// One requested line item: product, quantity, and the unit price agreed at
/// sale time.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateSalePosition {
    pub product_id: Uuid,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,
    pub price: Decimal,
}

/// Request to record a sale. An empty position list is legal and produces a
/// sale with no positions and no inventory effect.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateSaleRequest {
    pub customer_id: Uuid,
    #[validate]
    pub positions: Vec<CreateSalePosition>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SalePositionResponse {
    pub id: Uuid,
    pub sale_id: Uuid,
    pub product_id: Uuid,
    pub price: Decimal,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SaleResponse {
    pub id: Uuid,
    pub manager_id: Uuid,
    pub customer_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub positions: Vec<SalePositionResponse>,
}

/// Total revenue rollup for one manager.
#[derive(Debug, Serialize, Deserialize)]
pub struct ManagerSalesTotal {
    pub manager_id: Uuid,
    pub total: Decimal,
}

#[derive(FromQueryResult)]
struct RevenueRow {
    total: Option<Decimal>,
}

/// Service recording sales and aggregating their revenue.
#[derive(Clone)]
pub struct SaleService {
    db_pool: Arc<DbPool>,
}

impl SaleService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Records a sale for `manager_id` as a single unit of work.
    ///
    /// Positions are processed in submission order; duplicate product ids
    /// are treated as independent reservations against the same row. On any
    /// rejected position the transaction is rolled back and
    /// [`ServiceError::SaleRejected`] names the failing product.
    #[instrument(skip(self, request), fields(manager_id = %manager_id, customer_id = %request.customer_id, position_count = request.positions.len()))]
    pub async fn record_sale(
        &self,
        manager_id: Uuid,
        request: CreateSaleRequest,
    ) -> Result<SaleResponse, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;
        for position in &request.positions {
            if position.price < Decimal::ZERO {
                return Err(ServiceError::ValidationError(
                    "Position price cannot be negative".to_string(),
                ));
            }
        }

        let db = &*self.db_pool;
        let now = Utc::now();
        let sale_id = Uuid::new_v4();

        let txn = db.begin().await?;

        sale::ActiveModel {
            id: Set(sale_id),
            manager_id: Set(manager_id),
            customer_id: Set(request.customer_id),
            created_at: Set(now),
        }
        .insert(&txn)
        .await?;

        let mut position_models = Vec::with_capacity(request.positions.len());
        let mut position_responses = Vec::with_capacity(request.positions.len());

        for position in &request.positions {
            if !reserve_stock(&txn, position.product_id, position.quantity).await? {
                txn.rollback().await?;
                warn!(
                    product_id = %position.product_id,
                    quantity = position.quantity,
                    "sale rejected: position could not be reserved"
                );
                return Err(ServiceError::SaleRejected {
                    product_id: position.product_id,
                });
            }

            let position_id = Uuid::new_v4();
            position_models.push(sale_position::ActiveModel {
                id: Set(position_id),
                sale_id: Set(sale_id),
                product_id: Set(position.product_id),
                price: Set(position.price),
                quantity: Set(position.quantity),
                created_at: Set(now),
            });
            position_responses.push(SalePositionResponse {
                id: position_id,
                sale_id,
                product_id: position.product_id,
                price: position.price,
                quantity: position.quantity,
                created_at: now,
            });
        }

        // insert_many rejects an empty payload; a zero-position sale is just
        // the header.
        if !position_models.is_empty() {
            sale_position::Entity::insert_many(position_models)
                .exec(&txn)
                .await?;
        }

        txn.commit().await?;

        info!(
            sale_id = %sale_id,
            position_count = position_responses.len(),
            "sale recorded"
        );

        Ok(SaleResponse {
            id: sale_id,
            manager_id,
            customer_id: request.customer_id,
            created_at: now,
            positions: position_responses,
        })
    }

    /// Total revenue (`SUM(quantity * price)`) across all positions of all
    /// sales belonging to `manager_id`; zero when the manager has no sales.
    #[instrument(skip(self), fields(manager_id = %manager_id))]
    pub async fn total_for_manager(&self, manager_id: Uuid) -> Result<ManagerSalesTotal, ServiceError> {
        let db = &*self.db_pool;

        let row = sale_position::Entity::find()
            .select_only()
            .column_as(
                Expr::expr(
                    Expr::col((sale_position::Entity, sale_position::Column::Quantity)).mul(
                        Expr::col((sale_position::Entity, sale_position::Column::Price)),
                    ),
                )
                .sum(),
                "total",
            )
            .inner_join(sale::Entity)
            .filter(sale::Column::ManagerId.eq(manager_id))
            .into_model::<RevenueRow>()
            .one(db)
            .await?;

        let total = row.and_then(|r| r.total).unwrap_or_default();

        Ok(ManagerSalesTotal { manager_id, total })
    }

    /// Fetches a recorded sale with its positions.
    #[instrument(skip(self), fields(sale_id = %sale_id))]
    pub async fn get_sale(&self, sale_id: Uuid) -> Result<SaleResponse, ServiceError> {
        let db = &*self.db_pool;

        let header = sale::Entity::find_by_id(sale_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Sale {} not found", sale_id)))?;

        let positions = sale_position::Entity::find()
            .filter(sale_position::Column::SaleId.eq(sale_id))
            .all(db)
            .await?;

        Ok(SaleResponse {
            id: header.id,
            manager_id: header.manager_id,
            customer_id: header.customer_id,
            created_at: header.created_at,
            positions: positions
                .into_iter()
                .map(|p| SalePositionResponse {
                    id: p.id,
                    sale_id: p.sale_id,
                    product_id: p.product_id,
                    price: p.price,
                    quantity: p.quantity,
                    created_at: p.created_at,
                })
                .collect(),
        })
    }
}

/// Attempts to reserve `quantity` units of a product on the given
/// transaction handle.
///
/// The decrement and its preconditions (active flag, sufficient stock) are a
/// single conditional UPDATE, so two concurrent reservations for the same
/// product cannot both succeed past availability. Returns `false` when the
/// product is missing, inactive, or short on stock; that is a business
/// rejection, not an error.
async fn reserve_stock<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
    quantity: i32,
) -> Result<bool, ServiceError> {
    let result = product::Entity::update_many()
        .col_expr(
            product::Column::Quantity,
            Expr::col(product::Column::Quantity).sub(quantity),
        )
        .filter(product::Column::Id.eq(product_id))
        .filter(product::Column::IsActive.eq(true))
        .filter(product::Column::Quantity.gte(quantity))
        .exec(conn)
        .await?;

    Ok(result.rows_affected == 1)
}
