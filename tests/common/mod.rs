//! Shared helpers for DB-backed integration tests.
//!
//! Tests run against an in-memory SQLite database with a single pooled
//! connection so every query sees the same database.
#![allow(dead_code)]

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use uuid::Uuid;

use retail_api::auth::hash_password;
use retail_api::db::{self, DbConfig, DbPool};
use retail_api::entities::{customer, manager, product};

pub async fn setup_db() -> Arc<DbPool> {
    let config = DbConfig {
        url: "sqlite::memory:".to_string(),
        max_connections: 1,
        min_connections: 1,
        ..Default::default()
    };

    let pool = db::establish_connection_with_config(&config)
        .await
        .expect("db connect");
    db::run_migrations(&pool).await.expect("migrations");

    Arc::new(pool)
}

pub async fn seed_manager(db: &DbPool) -> Uuid {
    let id = Uuid::new_v4();
    manager::ActiveModel {
        id: Set(id),
        name: Set(format!("manager-{}", &id.to_string()[..8])),
        phone: Set(format!("+1{}", &id.simple().to_string()[..10])),
        password_hash: Set(hash_password("s3cret-pass").expect("hash")),
        is_admin: Set(false),
        created_at: Set(Utc::now()),
    }
    .insert(db)
    .await
    .expect("seed manager");
    id
}

pub async fn seed_customer(db: &DbPool) -> Uuid {
    let id = Uuid::new_v4();
    customer::ActiveModel {
        id: Set(id),
        name: Set(format!("customer-{}", &id.to_string()[..8])),
        phone: Set(format!("+2{}", &id.simple().to_string()[..10])),
        password_hash: Set(hash_password("s3cret-pass").expect("hash")),
        is_active: Set(true),
        created_at: Set(Utc::now()),
        updated_at: Set(None),
    }
    .insert(db)
    .await
    .expect("seed customer");
    id
}

pub async fn seed_product(db: &DbPool, price: Decimal, quantity: i32, active: bool) -> Uuid {
    let id = Uuid::new_v4();
    product::ActiveModel {
        id: Set(id),
        name: Set(format!("product-{}", &id.to_string()[..8])),
        price: Set(price),
        quantity: Set(quantity),
        is_active: Set(active),
        created_at: Set(Utc::now()),
        updated_at: Set(None),
    }
    .insert(db)
    .await
    .expect("seed product");
    id
}

pub async fn product_quantity(db: &DbPool, id: Uuid) -> i32 {
    product::Entity::find_by_id(id)
        .one(db)
        .await
        .expect("query product")
        .expect("product exists")
        .quantity
}
