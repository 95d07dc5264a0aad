mod common;

use rust_decimal_macros::dec;

use retail_api::services::sales::{CreateSalePosition, CreateSaleRequest, SaleService};

use common::{product_quantity, seed_customer, seed_manager, seed_product, setup_db};

// DB-backed test; run with: cargo test -- --ignored

#[tokio::test]
#[ignore]
async fn concurrent_sales_of_remaining_stock_allow_exactly_one() {
    let db = setup_db().await;
    let service = SaleService::new(db.clone());

    let customer_id = seed_customer(&db).await;
    let product_id = seed_product(&db, dec!(9.99), 5, true).await;

    let mut tasks = Vec::new();
    for _ in 0..2 {
        let service = service.clone();
        let db = db.clone();
        tasks.push(tokio::spawn(async move {
            let manager_id = seed_manager(&db).await;
            service
                .record_sale(
                    manager_id,
                    CreateSaleRequest {
                        customer_id,
                        positions: vec![CreateSalePosition {
                            product_id,
                            quantity: 5,
                            price: dec!(9.99),
                        }],
                    },
                )
                .await
                .is_ok()
        }));
    }

    let mut successes = 0;
    for task in tasks {
        if task.await.expect("task completes") {
            successes += 1;
        }
    }

    assert_eq!(
        successes, 1,
        "exactly one of the competing sales may claim the remaining stock"
    );
    assert_eq!(product_quantity(&db, product_id).await, 0);
}
