use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post, put},
    Router,
};
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::services::products::{CreateProductRequest, UpdateProductRequest};
use crate::{AppState, ListQuery, PaginatedResponse};

async fn create_product(
    State(state): State<AppState>,
    Json(request): Json<CreateProductRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let product = state.services.products.create_product(request).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let product = state.services.products.get_product(id).await?;
    Ok(Json(product))
}

async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let (items, total) = state
        .services
        .products
        .list_active_products(query.page, query.limit)
        .await?;
    Ok(Json(PaginatedResponse::new(
        items,
        total,
        query.page,
        query.limit,
    )))
}

async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateProductRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let product = state.services.products.update_product(id, request).await?;
    Ok(Json(product))
}

async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.products.remove_product(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/products", post(create_product))
        .route("/products", get(list_products))
        .route("/products/:id", get(get_product))
        .route("/products/:id", put(update_product))
        .route("/products/:id", delete(delete_product))
}
