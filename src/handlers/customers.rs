use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post, put},
    Router,
};
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::services::customers::{
    RegisterCustomerRequest, UpdateCustomerRequest, ValidateTokenRequest,
};
use crate::services::managers::LoginRequest;
use crate::{AppState, ListQuery, PaginatedResponse};

async fn register_customer(
    State(state): State<AppState>,
    Json(request): Json<RegisterCustomerRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let customer = state.services.customers.register(request).await?;
    Ok((StatusCode::CREATED, Json(customer)))
}

async fn login_customer(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let token = state.services.customers.login(request).await?;
    Ok(Json(token))
}

/// Resolves a previously issued customer token to the account it belongs to.
async fn validate_customer_token(
    State(state): State<AppState>,
    Json(request): Json<ValidateTokenRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let customer = state
        .services
        .customers
        .validate_token(&request.token, state.config.token_ttl_secs)
        .await?;
    Ok(Json(customer))
}

async fn get_customer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let customer = state.services.customers.get_customer(id).await?;
    Ok(Json(customer))
}

async fn list_customers(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let (items, total) = state
        .services
        .customers
        .list_customers(query.page, query.limit)
        .await?;
    Ok(Json(PaginatedResponse::new(
        items,
        total,
        query.page,
        query.limit,
    )))
}

async fn list_active_customers(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let (items, total) = state
        .services
        .customers
        .list_active_customers(query.page, query.limit)
        .await?;
    Ok(Json(PaginatedResponse::new(
        items,
        total,
        query.page,
        query.limit,
    )))
}

async fn update_customer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateCustomerRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let customer = state
        .services
        .customers
        .update_customer(id, request)
        .await?;
    Ok(Json(customer))
}

async fn block_customer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let customer = state.services.customers.set_active(id, false).await?;
    Ok(Json(customer))
}

async fn unblock_customer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let customer = state.services.customers.set_active(id, true).await?;
    Ok(Json(customer))
}

async fn delete_customer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.customers.remove_customer(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/customers", post(register_customer))
        .route("/customers/token", post(login_customer))
        .route("/customers/token/validate", post(validate_customer_token))
}

pub fn protected_routes() -> Router<AppState> {
    Router::new()
        .route("/customers", get(list_customers))
        .route("/customers/active", get(list_active_customers))
        .route("/customers/:id", get(get_customer))
        .route("/customers/:id", put(update_customer))
        .route("/customers/:id", delete(delete_customer))
        .route("/customers/:id/block", post(block_customer))
        .route("/customers/:id/unblock", post(unblock_customer))
}
