use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::http::HeaderValue;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use retail_api::config::{init_tracing, load_config, AppConfig};
use retail_api::db::{establish_connection_from_app_config, run_migrations};
use retail_api::handlers::api_router;
use retail_api::{AppServices, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = load_config().context("loading configuration")?;
    init_tracing(config.log_level(), config.log_json);

    info!(
        environment = %config.environment,
        version = env!("CARGO_PKG_VERSION"),
        "starting retail-api"
    );

    let db = Arc::new(
        establish_connection_from_app_config(&config)
            .await
            .context("connecting to database")?,
    );

    if config.auto_migrate {
        run_migrations(&db).await.context("running migrations")?;
    }

    let cors = build_cors(&config);
    let request_timeout = Duration::from_secs(config.request_timeout_secs);
    let addr = format!("{}:{}", config.host, config.port);

    let state = AppState {
        db: db.clone(),
        config,
        services: AppServices::new(db),
    };

    let app = api_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(request_timeout))
        .layer(cors);

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    info!(%addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("shutdown complete");
    Ok(())
}

/// CORS policy: explicit origins when configured, permissive in development,
/// locked down otherwise.
fn build_cors(config: &AppConfig) -> CorsLayer {
    match config.cors_allowed_origins.as_deref() {
        Some(origins) => {
            let parsed: Vec<HeaderValue> = origins
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .filter_map(|origin| match origin.parse::<HeaderValue>() {
                    Ok(value) => Some(value),
                    Err(_) => {
                        warn!(origin, "ignoring unparsable CORS origin");
                        None
                    }
                })
                .collect();
            CorsLayer::new()
                .allow_origin(parsed)
                .allow_methods(Any)
                .allow_headers(Any)
        }
        None if config.is_development() => CorsLayer::permissive(),
        None => CorsLayer::new(),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => warn!("failed to install SIGTERM handler: {}", e),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received Ctrl+C, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
