//! HTTP surface. Routes are split into a public set (health, token
//! exchange, customer self-registration) and a manager-guarded set behind
//! the bearer-token middleware.

pub mod customers;
pub mod health;
pub mod managers;
pub mod products;
pub mod sales;

use axum::{middleware, routing::get, Router};

use crate::{auth, AppState};

/// Assembles the full application router.
pub fn api_router(state: AppState) -> Router {
    let protected = Router::new()
        .merge(managers::protected_routes())
        .merge(sales::sale_routes())
        .merge(products::product_routes())
        .merge(customers::protected_routes())
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_manager,
        ));

    let public = Router::new()
        .merge(managers::public_routes())
        .merge(customers::public_routes());

    Router::new()
        .route("/health", get(health::health_check))
        .nest("/api/v1", public.merge(protected))
        .with_state(state)
}
