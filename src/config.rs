use std::env;
use std::time::Duration;

use crate::services::booking::MAX_SESSION_MINUTES;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub db_pool_size: u32,
    pub db_pool_timeout: Duration,
    pub cors_origin: String,
    pub default_session_minutes: i64,
}

fn parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            port: parsed("PORT", 5000),
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "portfolio.db".to_string()),
            db_pool_size: parsed("DB_POOL_SIZE", 8).max(1),
            db_pool_timeout: Duration::from_millis(parsed("DB_POOL_TIMEOUT_MS", 2000)),
            cors_origin: env::var("CORS_ORIGIN")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            default_session_minutes: parsed("DEFAULT_SESSION_MINUTES", 60),
        }
    }

    /// Rejects settings that would make every request fail.
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            (1..=MAX_SESSION_MINUTES).contains(&self.default_session_minutes),
            "DEFAULT_SESSION_MINUTES must be between 1 and {MAX_SESSION_MINUTES}, got {}",
            self.default_session_minutes
        );
        anyhow::ensure!(!self.database_url.trim().is_empty(), "DATABASE_URL must not be empty");
        Ok(())
    }
}
