//! Configuration module for the wine backend.
//!
//! All configuration is loaded from environment variables. Only the store connection
//! string is mandatory; everything else has a sensible default.

use std::env;
use std::net::SocketAddr;

/// Errors raised while loading configuration. All of them are fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("No database url specified! Please set DATABASE_URL environment variable before running this app.")]
    MissingDatabaseUrl,
    #[error("Invalid WINE_BIND_ADDR format: {0}")]
    InvalidBindAddr(String),
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Connection string of the record store (e.g. `sqlite:./data/wines.sqlite`)
    pub database_url: String,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Log level for the `audit` target
    pub audit_log_level: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .ok()
            .filter(|url| !url.trim().is_empty())
            .ok_or(ConfigError::MissingDatabaseUrl)?;

        let raw_bind_addr =
            env::var("WINE_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
        let bind_addr = raw_bind_addr
            .parse()
            .map_err(|_| ConfigError::InvalidBindAddr(raw_bind_addr.clone()))?;

        let log_level = env::var("WINE_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let audit_log_level =
            env::var("WINE_AUDIT_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            database_url,
            bind_addr,
            log_level,
            audit_log_level,
        })
    }

    /// Filter directive combining the application and audit log levels.
    pub fn log_directive(&self) -> String {
        format!("{},audit={}", self.log_level, self.audit_log_level)
    }
}
