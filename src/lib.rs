//! Retail API Library
//!
//! HTTP backend for a retail operation: customer and manager accounts,
//! product inventory, and transactional sale recording.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod handlers;
pub mod migrator;
pub mod services;

use std::sync::Arc;

use chrono::Utc;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};

use services::customers::CustomerService;
use services::managers::ManagerService;
use services::products::ProductService;
use services::sales::SaleService;

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub services: AppServices,
}

/// Service container wired once at startup.
#[derive(Clone)]
pub struct AppServices {
    pub customers: Arc<CustomerService>,
    pub managers: Arc<ManagerService>,
    pub products: Arc<ProductService>,
    pub sales: Arc<SaleService>,
}

impl AppServices {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            customers: Arc::new(CustomerService::new(db.clone())),
            managers: Arc::new(ManagerService::new(db.clone())),
            products: Arc::new(ProductService::new(db.clone())),
            sales: Arc::new(SaleService::new(db)),
        }
    }
}

// Common response wrappers

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub timestamp: String,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

/// Common query parameters for list endpoints.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
}

fn default_page() -> u64 {
    1
}
fn default_limit() -> u64 {
    20
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            page: default_page(),
            limit: default_limit(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
}

impl<T> PaginatedResponse<T> {
    pub fn new(items: Vec<T>, total: u64, page: u64, limit: u64) -> Self {
        let total_pages = if total == 0 {
            0
        } else {
            (total + limit - 1) / limit
        };
        Self {
            items,
            total,
            page,
            limit,
            total_pages,
        }
    }
}

#[cfg(test)]
mod response_tests {
    use super::*;

    #[test]
    fn success_response_carries_data_and_timestamp() {
        let response = ApiResponse::success("ok");
        assert!(response.success);
        assert_eq!(response.data, Some("ok"));
        chrono::DateTime::parse_from_rfc3339(&response.timestamp).expect("timestamp should parse");
    }

    #[test]
    fn paginated_response_rounds_page_count_up() {
        let page = PaginatedResponse::new(vec![1, 2, 3], 41, 1, 20);
        assert_eq!(page.total_pages, 3);
        let empty = PaginatedResponse::<i32>::new(vec![], 0, 1, 20);
        assert_eq!(empty.total_pages, 0);
    }
}
