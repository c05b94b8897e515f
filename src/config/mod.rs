//! Configuration module for the invitation sync backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use url::Url;

/// Default quiescence window for preview debouncing.
pub const DEFAULT_DEBOUNCE_MS: u64 = 500;
/// Default serialized-size threshold for inline preview transfer.
pub const DEFAULT_INLINE_LIMIT: usize = 8_000;
/// Default time an unwatched preview session survives without editor activity.
pub const DEFAULT_PREVIEW_IDLE_SECS: u64 = 600;
/// Default per-subscriber buffer of the change feed.
pub const DEFAULT_REALTIME_CAPACITY: usize = 256;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Origin the inline preview addresses are built on
    pub preview_base_url: Url,
    /// Quiescence window between the last edit and a preview emission
    pub preview_debounce: Duration,
    /// Serialized snapshots at or above this many characters are split
    pub preview_inline_limit: usize,
    /// Unwatched preview sessions close after this long without editor activity
    pub preview_idle: Duration,
    /// Whether the realtime change feed is available at all
    pub realtime_enabled: bool,
    /// Buffered notifications per dashboard subscriber
    pub realtime_capacity: usize,
}

/// Startup configuration failure.
#[derive(Debug)]
pub enum ConfigError {
    InvalidBindAddr(String),
    InvalidBaseUrl(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidBindAddr(value) => {
                write!(f, "Invalid INVITE_BIND_ADDR format: {}", value)
            }
            ConfigError::InvalidBaseUrl(value) => {
                write!(f, "Invalid INVITE_PREVIEW_BASE_URL: {}", value)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let db_path = env::var("INVITE_DB_PATH")
            .unwrap_or_else(|_| "./data/invitations.sqlite".to_string())
            .into();

        let bind_raw = env::var("INVITE_BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
        let bind_addr = bind_raw
            .parse()
            .map_err(|_| ConfigError::InvalidBindAddr(bind_raw.clone()))?;

        let log_level = env::var("INVITE_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let base_raw = env::var("INVITE_PREVIEW_BASE_URL")
            .unwrap_or_else(|_| "http://127.0.0.1:8080".to_string());
        let preview_base_url =
            Url::parse(&base_raw).map_err(|_| ConfigError::InvalidBaseUrl(base_raw.clone()))?;

        let preview_debounce =
            Duration::from_millis(parse_or("INVITE_PREVIEW_DEBOUNCE_MS", DEFAULT_DEBOUNCE_MS));
        let preview_inline_limit = parse_or("INVITE_PREVIEW_INLINE_LIMIT", DEFAULT_INLINE_LIMIT);
        let preview_idle = Duration::from_secs(parse_or(
            "INVITE_PREVIEW_IDLE_SECS",
            DEFAULT_PREVIEW_IDLE_SECS,
        ));
        let realtime_enabled = parse_or("INVITE_REALTIME_ENABLED", true);
        let realtime_capacity = parse_or("INVITE_REALTIME_CAPACITY", DEFAULT_REALTIME_CAPACITY);

        Ok(Self {
            db_path,
            bind_addr,
            log_level,
            preview_base_url,
            preview_debounce,
            preview_inline_limit,
            preview_idle,
            realtime_enabled,
            realtime_capacity: realtime_capacity.max(1),
        })
    }
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("Ignoring malformed {}={:?}, using default", key, raw);
            default
        }),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEYS: [&str; 9] = [
        "INVITE_DB_PATH",
        "INVITE_BIND_ADDR",
        "INVITE_LOG_LEVEL",
        "INVITE_PREVIEW_BASE_URL",
        "INVITE_PREVIEW_DEBOUNCE_MS",
        "INVITE_PREVIEW_INLINE_LIMIT",
        "INVITE_PREVIEW_IDLE_SECS",
        "INVITE_REALTIME_ENABLED",
        "INVITE_REALTIME_CAPACITY",
    ];

    // Single test so the process environment is not mutated concurrently.
    #[test]
    fn test_config_from_env() {
        for key in KEYS {
            env::remove_var(key);
        }

        let config = Config::from_env().unwrap();

        assert_eq!(config.db_path, PathBuf::from("./data/invitations.sqlite"));
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:8080");
        assert_eq!(config.log_level, "info");
        assert_eq!(config.preview_base_url.as_str(), "http://127.0.0.1:8080/");
        assert_eq!(config.preview_debounce, Duration::from_millis(500));
        assert_eq!(config.preview_inline_limit, 8_000);
        assert_eq!(config.preview_idle, Duration::from_secs(600));
        assert!(config.realtime_enabled);
        assert_eq!(config.realtime_capacity, 256);

        env::set_var("INVITE_PREVIEW_DEBOUNCE_MS", "not-a-number");
        env::set_var("INVITE_REALTIME_ENABLED", "false");
        let config = Config::from_env().unwrap();
        assert_eq!(config.preview_debounce, Duration::from_millis(500));
        assert!(!config.realtime_enabled);

        env::set_var("INVITE_BIND_ADDR", "nowhere");
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::InvalidBindAddr(_))
        ));

        for key in KEYS {
            env::remove_var(key);
        }
    }
}
