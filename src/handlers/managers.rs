use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Extension, Router,
};

use crate::auth::AuthManager;
use crate::errors::ServiceError;
use crate::services::managers::{LoginRequest, RegisterManagerRequest};
use crate::AppState;

/// Only admins may create manager accounts.
async fn register_manager(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthManager>,
    Json(request): Json<RegisterManagerRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    auth.require_admin()?;
    let token = state.services.managers.register(request).await?;
    Ok((StatusCode::CREATED, Json(token)))
}

async fn login_manager(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let token = state.services.managers.login(request).await?;
    Ok(Json(token))
}

pub fn public_routes() -> Router<AppState> {
    Router::new().route("/managers/token", post(login_manager))
}

pub fn protected_routes() -> Router<AppState> {
    Router::new().route("/managers", post(register_manager))
}
