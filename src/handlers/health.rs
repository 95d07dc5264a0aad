use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

use crate::db::check_connection;
use crate::{ApiResponse, AppState};

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub version: &'static str,
    pub database: &'static str,
}

/// Liveness probe. Reports degraded (503) when the database is unreachable.
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let database_up = check_connection(&state.db).await.is_ok();

    let status = HealthStatus {
        status: if database_up { "ok" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        database: if database_up { "up" } else { "down" },
    };

    let code = if database_up {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (code, Json(ApiResponse::success(status)))
}
