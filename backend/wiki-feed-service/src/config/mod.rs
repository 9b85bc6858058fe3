use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

use crate::services::{CacheConfig, FeedConfig, InterestConfig};
use crate::sources::GuardConfig;

pub type ConfigError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub source: SourceConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub interests: InterestConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub env: String,
    pub host: String,
    pub port: u16,
    pub log_level: String,
}

impl AppConfig {
    /// Filter used when `RUST_LOG` is not set
    pub fn default_log_filter(&self) -> String {
        format!("{},actix_web=info", self.log_level)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Postgres,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StorageBackend::Postgres),
            "memory" => Ok(StorageBackend::Memory),
            other => Err(format!("unknown storage backend: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub backend: StorageBackend,
    /// Empty for the memory backend
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_acquire_timeout_secs")]
    pub acquire_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default = "default_wiki_api_url")]
    pub api_url: String,
    #[serde(default = "default_wiki_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_source_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_source_failure_threshold")]
    pub failure_threshold: u32,
    #[serde(default = "default_source_cooldown_secs")]
    pub cooldown_secs: u64,
}

impl SourceConfig {
    pub fn guard(&self) -> GuardConfig {
        GuardConfig {
            timeout: Duration::from_millis(self.timeout_ms),
            failure_threshold: self.failure_threshold,
            cooldown: Duration::from_secs(self.cooldown_secs),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let backend: StorageBackend = std::env::var("STORAGE_BACKEND")
            .unwrap_or_else(|_| "postgres".to_string())
            .parse()?;

        let url = match backend {
            StorageBackend::Postgres => std::env::var("DATABASE_URL")
                .map_err(|_| "DATABASE_URL must be set for the postgres backend")?,
            StorageBackend::Memory => std::env::var("DATABASE_URL").unwrap_or_default(),
        };

        let feed = FeedConfig {
            page_size: env_or("FEED_PAGE_SIZE", FeedConfig::default().page_size)?,
            load_more_size: env_or("FEED_LOAD_MORE_SIZE", FeedConfig::default().load_more_size)?,
            ..FeedConfig::default()
        };

        Ok(Config {
            app: AppConfig {
                env: std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
                host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: std::env::var("APP_PORT")
                    .unwrap_or_else(|_| "8000".to_string())
                    .parse()?,
                log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            },
            database: DatabaseConfig {
                backend,
                url,
                max_connections: env_or("DATABASE_MAX_CONNECTIONS", default_max_connections())?,
                acquire_timeout_secs: env_or(
                    "DATABASE_ACQUIRE_TIMEOUT_SECS",
                    default_acquire_timeout_secs(),
                )?,
            },
            source: SourceConfig {
                api_url: std::env::var("WIKI_API_URL").unwrap_or_else(|_| default_wiki_api_url()),
                user_agent: std::env::var("WIKI_USER_AGENT")
                    .unwrap_or_else(|_| default_wiki_user_agent()),
                timeout_ms: env_or("SOURCE_TIMEOUT_MS", default_source_timeout_ms())?,
                failure_threshold: env_or(
                    "SOURCE_FAILURE_THRESHOLD",
                    default_source_failure_threshold(),
                )?,
                cooldown_secs: env_or("SOURCE_COOLDOWN_SECS", default_source_cooldown_secs())?,
            },
            cache: CacheConfig::default(),
            feed,
            interests: InterestConfig::default(),
        })
    }
}

/// Parse `key` when set, otherwise fall back to `default`. A set but
/// malformed value is an error.
fn env_or<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| format!("invalid {}: {}", key, e).into()),
        Err(_) => Ok(default),
    }
}

fn default_max_connections() -> u32 {
    10
}

fn default_acquire_timeout_secs() -> u64 {
    5
}

fn default_wiki_api_url() -> String {
    "https://en.wikipedia.org/w/api.php".to_string()
}

fn default_wiki_user_agent() -> String {
    "wiki-feed-service/0.1 (https://github.com/wikifeed)".to_string()
}

fn default_source_timeout_ms() -> u64 {
    8_000
}

fn default_source_failure_threshold() -> u32 {
    5
}

fn default_source_cooldown_secs() -> u64 {
    30
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: &[&str] = &[
        "APP_ENV",
        "APP_HOST",
        "APP_PORT",
        "STORAGE_BACKEND",
        "DATABASE_URL",
        "DATABASE_MAX_CONNECTIONS",
        "WIKI_API_URL",
        "SOURCE_TIMEOUT_MS",
        "FEED_PAGE_SIZE",
        "LOG_LEVEL",
    ];

    fn clear_env() {
        for var in VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_memory_backend_defaults() {
        clear_env();
        std::env::set_var("STORAGE_BACKEND", "memory");

        let config = Config::from_env().unwrap();
        assert_eq!(config.database.backend, StorageBackend::Memory);
        assert_eq!(config.app.port, 8000);
        assert_eq!(config.source.api_url, "https://en.wikipedia.org/w/api.php");
        assert_eq!(config.source.guard().timeout, Duration::from_secs(8));
        assert_eq!(config.feed.page_size, 5);
        assert_eq!(config.feed.load_more_size, 3);
        assert_eq!(config.interests.max_tags, 15);
        clear_env();
    }

    #[test]
    #[serial]
    fn test_postgres_requires_database_url() {
        clear_env();
        std::env::set_var("STORAGE_BACKEND", "postgres");
        assert!(Config::from_env().is_err());

        std::env::set_var("DATABASE_URL", "postgres://localhost/wiki");
        let config = Config::from_env().unwrap();
        assert_eq!(config.database.url, "postgres://localhost/wiki");
        clear_env();
    }

    #[test]
    #[serial]
    fn test_overrides_and_malformed_values() {
        clear_env();
        std::env::set_var("STORAGE_BACKEND", "memory");
        std::env::set_var("FEED_PAGE_SIZE", "8");
        std::env::set_var("SOURCE_TIMEOUT_MS", "250");

        let config = Config::from_env().unwrap();
        assert_eq!(config.feed.page_size, 8);
        assert_eq!(config.source.guard().timeout, Duration::from_millis(250));

        std::env::set_var("DATABASE_MAX_CONNECTIONS", "lots");
        assert!(Config::from_env().is_err());
        clear_env();
    }

    #[test]
    #[serial]
    fn test_log_level_feeds_default_filter() {
        clear_env();
        std::env::set_var("STORAGE_BACKEND", "memory");
        assert_eq!(
            Config::from_env().unwrap().app.default_log_filter(),
            "info,actix_web=info"
        );

        std::env::set_var("LOG_LEVEL", "debug");
        let config = Config::from_env().unwrap();
        assert_eq!(config.app.log_level, "debug");
        assert_eq!(config.app.default_log_filter(), "debug,actix_web=info");
        clear_env();
    }

    #[test]
    fn test_storage_backend_parse() {
        assert_eq!("Memory".parse::<StorageBackend>(), Ok(StorageBackend::Memory));
        assert_eq!("postgresql".parse::<StorageBackend>(), Ok(StorageBackend::Postgres));
        assert!("redis".parse::<StorageBackend>().is_err());
    }
}
