use std::env;
use std::path::Path;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

const CONFIG_DIR: &str = "config";
const DEFAULT_ENV: &str = "development";
const DEFAULT_LOG_LEVEL: &str = "info";

/// Application configuration, loaded from defaults, optional `config/` files,
/// and `APP__*` environment variables (highest precedence).
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub log_level: String,
    pub log_json: bool,

    // Connection pool tuning
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_connect_timeout_secs: u64,
    pub db_acquire_timeout_secs: u64,
    pub db_idle_timeout_secs: u64,

    /// Lifetime of issued auth tokens, in seconds.
    pub token_ttl_secs: i64,
    /// Run embedded migrations at startup.
    pub auto_migrate: bool,
    /// Per-request timeout applied by the HTTP layer.
    pub request_timeout_secs: u64,
    /// Comma-separated list of allowed CORS origins; unset means permissive
    /// CORS in development only.
    pub cors_allowed_origins: Option<String>,
}

impl AppConfig {
    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
            || self.environment.eq_ignore_ascii_case("test")
    }
}

#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] ConfigError),
}

pub fn load_config() -> Result<AppConfig, AppConfigError> {
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    info!("Loading configuration for environment: {}", run_env);

    if !Path::new(CONFIG_DIR).exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            CONFIG_DIR
        );
    }

    let config = Config::builder()
        .set_default("database_url", "sqlite://retail.db?mode=rwc")?
        .set_default("host", "0.0.0.0")?
        .set_default("port", 8080)?
        .set_default("environment", DEFAULT_ENV)?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .set_default("db_max_connections", 10)?
        .set_default("db_min_connections", 1)?
        .set_default("db_connect_timeout_secs", 30)?
        .set_default("db_acquire_timeout_secs", 8)?
        .set_default("db_idle_timeout_secs", 600)?
        .set_default("token_ttl_secs", 86400)?
        .set_default("auto_migrate", true)?
        .set_default("request_timeout_secs", 30)?
        .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
        .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, run_env)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    Ok(config.try_deserialize()?)
}

/// Initialize the global tracing subscriber. `RUST_LOG` overrides the
/// configured level when set.
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let default_directive = format!("retail_api={},tower_http=debug", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    if json {
        tracing_subscriber::registry()
            .with(EnvFilter::new(filter_directive))
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(EnvFilter::new(filter_directive))
            .with(fmt::layer())
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_load_without_environment() {
        let cfg = load_config().expect("defaults should load");
        assert_eq!(cfg.port, 8080);
        assert!(cfg.auto_migrate);
        assert!(cfg.is_development());
        assert_eq!(cfg.token_ttl_secs, 86400);
    }
}
