use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Extension, Router,
};
use uuid::Uuid;

use crate::auth::AuthManager;
use crate::errors::ServiceError;
use crate::services::sales::CreateSaleRequest;
use crate::AppState;

/// Records a sale on behalf of the authenticated manager.
async fn create_sale(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthManager>,
    Json(request): Json<CreateSaleRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let sale = state
        .services
        .sales
        .record_sale(auth.manager_id, request)
        .await?;
    Ok((StatusCode::CREATED, Json(sale)))
}

/// Total revenue across the authenticated manager's sales.
async fn sales_total(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthManager>,
) -> Result<impl IntoResponse, ServiceError> {
    let total = state
        .services
        .sales
        .total_for_manager(auth.manager_id)
        .await?;
    Ok(Json(total))
}

async fn get_sale(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let sale = state.services.sales.get_sale(id).await?;
    Ok(Json(sale))
}

pub fn sale_routes() -> Router<AppState> {
    Router::new()
        .route("/managers/sales", post(create_sale))
        .route("/managers/sales", get(sales_total))
        .route("/managers/sales/:id", get(get_sale))
}
