mod common;

use rust_decimal_macros::dec;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use uuid::Uuid;

use assert_matches::assert_matches;
use retail_api::entities::{sale, sale_position};
use retail_api::errors::ServiceError;
use retail_api::services::sales::{CreateSalePosition, CreateSaleRequest, SaleService};

use common::{product_quantity, seed_customer, seed_manager, seed_product, setup_db};

// DB-backed tests; run with: cargo test -- --ignored

#[tokio::test]
#[ignore]
async fn recorded_sale_decrements_stock_and_persists_positions() {
    let db = setup_db().await;
    let service = SaleService::new(db.clone());

    let manager_id = seed_manager(&db).await;
    let customer_id = seed_customer(&db).await;
    let product_id = seed_product(&db, dec!(12.50), 10, true).await;

    let sale = service
        .record_sale(
            manager_id,
            CreateSaleRequest {
                customer_id,
                positions: vec![CreateSalePosition {
                    product_id,
                    quantity: 3,
                    price: dec!(12.50),
                }],
            },
        )
        .await
        .expect("sale should be recorded");

    assert_eq!(sale.manager_id, manager_id);
    assert_eq!(sale.positions.len(), 1);
    assert_eq!(product_quantity(&db, product_id).await, 7);

    let stored_positions = sale_position::Entity::find()
        .filter(sale_position::Column::SaleId.eq(sale.id))
        .all(&*db)
        .await
        .expect("query positions");
    assert_eq!(stored_positions.len(), 1);
    assert_eq!(stored_positions[0].quantity, 3);
    assert_eq!(stored_positions[0].product_id, product_id);
}

#[tokio::test]
#[ignore]
async fn rejection_rolls_back_header_and_prior_reservations() {
    let db = setup_db().await;
    let service = SaleService::new(db.clone());

    let manager_id = seed_manager(&db).await;
    let customer_id = seed_customer(&db).await;
    let plentiful = seed_product(&db, dec!(5.00), 5, true).await;
    let scarce = seed_product(&db, dec!(8.00), 1, true).await;

    let err = service
        .record_sale(
            manager_id,
            CreateSaleRequest {
                customer_id,
                positions: vec![
                    CreateSalePosition {
                        product_id: plentiful,
                        quantity: 2,
                        price: dec!(5.00),
                    },
                    CreateSalePosition {
                        product_id: scarce,
                        quantity: 3,
                        price: dec!(8.00),
                    },
                ],
            },
        )
        .await
        .expect_err("second position exceeds stock");

    assert_matches!(err, ServiceError::SaleRejected { product_id } if product_id == scarce);

    // The reservation made for the first position must be undone.
    assert_eq!(product_quantity(&db, plentiful).await, 5);
    assert_eq!(product_quantity(&db, scarce).await, 1);

    let sales = sale::Entity::find().count(&*db).await.expect("count sales");
    let positions = sale_position::Entity::find()
        .count(&*db)
        .await
        .expect("count positions");
    assert_eq!(sales, 0);
    assert_eq!(positions, 0);
}

#[tokio::test]
#[ignore]
async fn duplicate_lines_reserve_cumulatively() {
    let db = setup_db().await;
    let service = SaleService::new(db.clone());

    let manager_id = seed_manager(&db).await;
    let customer_id = seed_customer(&db).await;
    let product_id = seed_product(&db, dec!(5.00), 3, true).await;

    let line = CreateSalePosition {
        product_id,
        quantity: 2,
        price: dec!(5.00),
    };
    let err = service
        .record_sale(
            manager_id,
            CreateSaleRequest {
                customer_id,
                positions: vec![line.clone(), line],
            },
        )
        .await
        .expect_err("two lines of 2 against stock of 3 must fail");

    assert!(matches!(err, ServiceError::SaleRejected { .. }));
    assert_eq!(product_quantity(&db, product_id).await, 3);
}

#[tokio::test]
#[ignore]
async fn duplicate_lines_within_stock_both_commit() {
    let db = setup_db().await;
    let service = SaleService::new(db.clone());

    let manager_id = seed_manager(&db).await;
    let customer_id = seed_customer(&db).await;
    let product_id = seed_product(&db, dec!(5.00), 4, true).await;

    let line = CreateSalePosition {
        product_id,
        quantity: 2,
        price: dec!(5.00),
    };
    let sale = service
        .record_sale(
            manager_id,
            CreateSaleRequest {
                customer_id,
                positions: vec![line.clone(), line],
            },
        )
        .await
        .expect("both lines fit into stock");

    assert_eq!(sale.positions.len(), 2);
    assert_eq!(product_quantity(&db, product_id).await, 0);
}

#[tokio::test]
#[ignore]
async fn inactive_product_cannot_be_sold() {
    let db = setup_db().await;
    let service = SaleService::new(db.clone());

    let manager_id = seed_manager(&db).await;
    let customer_id = seed_customer(&db).await;
    let product_id = seed_product(&db, dec!(5.00), 10, false).await;

    let err = service
        .record_sale(
            manager_id,
            CreateSaleRequest {
                customer_id,
                positions: vec![CreateSalePosition {
                    product_id,
                    quantity: 1,
                    price: dec!(5.00),
                }],
            },
        )
        .await
        .expect_err("inactive product must reject the sale");

    assert!(matches!(err, ServiceError::SaleRejected { .. }));
    assert_eq!(product_quantity(&db, product_id).await, 10);
}

#[tokio::test]
#[ignore]
async fn unknown_product_rejects_the_sale() {
    let db = setup_db().await;
    let service = SaleService::new(db.clone());

    let manager_id = seed_manager(&db).await;
    let customer_id = seed_customer(&db).await;
    let missing = Uuid::new_v4();

    let err = service
        .record_sale(
            manager_id,
            CreateSaleRequest {
                customer_id,
                positions: vec![CreateSalePosition {
                    product_id: missing,
                    quantity: 1,
                    price: dec!(5.00),
                }],
            },
        )
        .await
        .expect_err("nonexistent product must reject the sale");

    assert_matches!(err, ServiceError::SaleRejected { product_id } if product_id == missing);
}

#[tokio::test]
#[ignore]
async fn zero_position_sale_commits_header_only() {
    let db = setup_db().await;
    let service = SaleService::new(db.clone());

    let manager_id = seed_manager(&db).await;
    let customer_id = seed_customer(&db).await;

    let sale = service
        .record_sale(
            manager_id,
            CreateSaleRequest {
                customer_id,
                positions: vec![],
            },
        )
        .await
        .expect("empty sale is legal");

    assert!(sale.positions.is_empty());

    let header = sale::Entity::find_by_id(sale.id)
        .one(&*db)
        .await
        .expect("query sale")
        .expect("header persisted");
    assert_eq!(header.customer_id, customer_id);

    let positions = sale_position::Entity::find()
        .count(&*db)
        .await
        .expect("count positions");
    assert_eq!(positions, 0);
}

#[tokio::test]
#[ignore]
async fn identical_requests_record_two_sales() {
    let db = setup_db().await;
    let service = SaleService::new(db.clone());

    let manager_id = seed_manager(&db).await;
    let customer_id = seed_customer(&db).await;
    let product_id = seed_product(&db, dec!(5.00), 4, true).await;

    let request = || CreateSaleRequest {
        customer_id,
        positions: vec![CreateSalePosition {
            product_id,
            quantity: 2,
            price: dec!(5.00),
        }],
    };

    let first = service
        .record_sale(manager_id, request())
        .await
        .expect("first sale");
    let second = service
        .record_sale(manager_id, request())
        .await
        .expect("second identical sale is its own event");

    assert_ne!(first.id, second.id);
    assert_eq!(product_quantity(&db, product_id).await, 0);

    let sales = sale::Entity::find().count(&*db).await.expect("count sales");
    assert_eq!(sales, 2);
}
