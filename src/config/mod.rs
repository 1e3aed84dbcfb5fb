//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Session pulse / character motion tick interval
    pub tick_interval: Duration,

    /// Root directory holding character and map definitions
    pub assets_dir: PathBuf,
    /// Directory of static client files served at `/`
    pub public_dir: PathBuf,

    /// Character assigned to new connections; defaults to the first catalog
    /// entry when unset
    pub default_character: Option<String>,
    /// Map backing the default session; defaults to the first catalog entry
    pub default_map: Option<String>,

    /// Allowed client origin for CORS
    pub client_origin: String,
}

/// Default pulse interval in milliseconds
const DEFAULT_TICK_INTERVAL_MS: u64 = 100;

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Hosting platforms provide PORT, fall back to SERVER_ADDR or default
        let server_addr = if let Ok(port) = env::var("PORT") {
            format!("0.0.0.0:{}", port)
        } else {
            env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string())
        };

        let tick_interval_ms = match env::var("TICK_INTERVAL_MS") {
            Ok(raw) => raw
                .parse::<u64>()
                .ok()
                .filter(|ms| *ms > 0)
                .ok_or(ConfigError::InvalidNumber("TICK_INTERVAL_MS"))?,
            Err(_) => DEFAULT_TICK_INTERVAL_MS,
        };

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,

            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),

            tick_interval: Duration::from_millis(tick_interval_ms),

            assets_dir: env::var("ASSETS_DIR")
                .unwrap_or_else(|_| "assets".to_string())
                .into(),
            public_dir: env::var("PUBLIC_DIR")
                .unwrap_or_else(|_| "public".to_string())
                .into(),

            default_character: env::var("DEFAULT_CHARACTER").ok(),
            default_map: env::var("DEFAULT_MAP").ok(),

            client_origin: env::var("CLIENT_ORIGIN").unwrap_or_else(|_| "*".to_string()),
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid server address format")]
    InvalidAddress,

    #[error("Invalid numeric value for {0}")]
    InvalidNumber(&'static str),
}
