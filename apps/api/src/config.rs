use std::time::Duration;

use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    /// Base URL of the hosted backend serving the stage edge functions.
    pub functions_url: String,
    pub functions_api_key: String,
    pub port: u16,
    pub rust_log: String,
    /// Upper bound on a single remote stage call, enforced by the controller.
    pub stage_timeout: Duration,
    /// Pause between a successful stage and the journey state reload.
    pub reload_delay: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            functions_url: require_env("FUNCTIONS_URL")?,
            functions_api_key: require_env("FUNCTIONS_API_KEY")?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            stage_timeout: Duration::from_secs(optional_u64("STAGE_TIMEOUT_SECS", 180)?),
            reload_delay: Duration::from_millis(optional_u64("RELOAD_DELAY_MS", 1000)?),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_u64(key: &str, default: u64) -> Result<u64> {
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<u64>()
            .with_context(|| format!("{key} must be a non-negative integer")),
        Err(_) => Ok(default),
    }
}
