//! Application configuration structs
//!
//! Loads configuration from environment variables (and a `.env` file when present).

use chrono::Weekday;
use serde::Deserialize;
use std::env;
use std::str::FromStr;
use std::time::Duration;

use tuning_core::Partition;

/// Main application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub app: AppSettings,
    pub api: ServerConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub cache: CacheConfig,
    pub retry: RetryConfig,
    pub jobs: JobsConfig,
}

/// General application settings
#[derive(Debug, Clone, Deserialize)]
pub struct AppSettings {
    #[serde(default = "default_app_name")]
    pub name: String,
    #[serde(default = "default_env")]
    pub env: Environment,
}

/// Environment type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    #[must_use]
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    #[must_use]
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Database configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    /// Upper bound on waiting for a report row lock
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
}

/// Redis configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: String,
    #[serde(default = "default_redis_max_connections")]
    pub max_connections: u32,
}

/// Report cache TTLs and partition
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub partition: Partition,
    pub page_ttl_secs: u64,
    pub snapshot_ttl_secs: u64,
    pub user_reaction_ttl_secs: u64,
    pub dirty_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            partition: Partition::default(),
            page_ttl_secs: 3600,
            snapshot_ttl_secs: 3600,
            user_reaction_ttl_secs: 1800,
            dirty_ttl_secs: 86_400,
        }
    }
}

/// Reaction toggle retry budget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub multiplier: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 100,
            multiplier: 2,
        }
    }
}

/// Scheduled job configuration
#[derive(Debug, Clone)]
pub struct JobsConfig {
    pub enabled: bool,
    pub flush_interval: Duration,
    /// Weekly warmup slot (UTC)
    pub warmup_weekday: Weekday,
    pub warmup_hour: u32,
    pub warmup_minute: u32,
    pub warmup_lock_ttl: Duration,
    pub visibility_interval: Duration,
    /// Minimum age of a generated report before it is published
    pub visibility_delay: Duration,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            flush_interval: Duration::from_secs(30 * 60),
            warmup_weekday: Weekday::Mon,
            warmup_hour: 4,
            warmup_minute: 0,
            warmup_lock_ttl: Duration::from_secs(60),
            visibility_interval: Duration::from_secs(5 * 60),
            visibility_delay: Duration::ZERO,
        }
    }
}

// Default value functions
fn default_app_name() -> String {
    "tuning-server".to_string()
}

fn default_env() -> Environment {
    Environment::Development
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_max_connections() -> u32 {
    20
}

fn default_min_connections() -> u32 {
    5
}

fn default_lock_timeout_ms() -> u64 {
    3000
}

fn default_redis_max_connections() -> u32 {
    10
}

/// Parse an optional variable, falling back to `default` when unset
fn parse_or<T, F>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key, raw)),
        None => Ok(default),
    }
}

/// Parse a required variable
fn required<T, F>(lookup: &F, key: &'static str) -> Result<T, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key).ok_or(ConfigError::MissingVar(key))?;
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue(key, raw))
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error if required environment variables are missing or malformed
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let jobs_default = JobsConfig::default();
        let retry_default = RetryConfig::default();
        let cache_default = CacheConfig::default();

        let retry = RetryConfig {
            max_attempts: parse_or(&lookup, "REACTION_RETRY_MAX_ATTEMPTS", retry_default.max_attempts)?,
            base_delay_ms: parse_or(&lookup, "REACTION_RETRY_BASE_DELAY_MS", retry_default.base_delay_ms)?,
            multiplier: parse_or(&lookup, "REACTION_RETRY_MULTIPLIER", retry_default.multiplier)?,
        };
        if retry.max_attempts == 0 {
            return Err(ConfigError::InvalidValue(
                "REACTION_RETRY_MAX_ATTEMPTS",
                "0".to_string(),
            ));
        }

        let warmup_hour: u32 = parse_or(&lookup, "WARMUP_HOUR", jobs_default.warmup_hour)?;
        if warmup_hour > 23 {
            return Err(ConfigError::InvalidValue("WARMUP_HOUR", warmup_hour.to_string()));
        }
        let warmup_minute: u32 = parse_or(&lookup, "WARMUP_MINUTE", jobs_default.warmup_minute)?;
        if warmup_minute > 59 {
            return Err(ConfigError::InvalidValue("WARMUP_MINUTE", warmup_minute.to_string()));
        }

        Ok(Self {
            app: AppSettings {
                name: lookup("APP_NAME").unwrap_or_else(default_app_name),
                env: lookup("APP_ENV")
                    .and_then(|s| match s.to_lowercase().as_str() {
                        "production" => Some(Environment::Production),
                        "staging" => Some(Environment::Staging),
                        "development" => Some(Environment::Development),
                        _ => None,
                    })
                    .unwrap_or_default(),
            },
            api: ServerConfig {
                host: lookup("API_HOST").unwrap_or_else(default_host),
                port: required(&lookup, "API_PORT")?,
            },
            database: DatabaseConfig {
                url: lookup("DATABASE_URL").ok_or(ConfigError::MissingVar("DATABASE_URL"))?,
                max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", default_max_connections())?,
                min_connections: parse_or(&lookup, "DATABASE_MIN_CONNECTIONS", default_min_connections())?,
                lock_timeout_ms: parse_or(&lookup, "DATABASE_LOCK_TIMEOUT_MS", default_lock_timeout_ms())?,
            },
            redis: RedisConfig {
                url: lookup("REDIS_URL").ok_or(ConfigError::MissingVar("REDIS_URL"))?,
                max_connections: parse_or(&lookup, "REDIS_MAX_CONNECTIONS", default_redis_max_connections())?,
            },
            cache: CacheConfig {
                partition: parse_or(&lookup, "REPORT_CACHE_PARTITION", cache_default.partition)?,
                page_ttl_secs: parse_or(&lookup, "REPORT_PAGE_TTL_SECS", cache_default.page_ttl_secs)?,
                snapshot_ttl_secs: parse_or(&lookup, "REPORT_SNAPSHOT_TTL_SECS", cache_default.snapshot_ttl_secs)?,
                user_reaction_ttl_secs: parse_or(
                    &lookup,
                    "REPORT_USER_REACTION_TTL_SECS",
                    cache_default.user_reaction_ttl_secs,
                )?,
                dirty_ttl_secs: parse_or(&lookup, "REPORT_DIRTY_TTL_SECS", cache_default.dirty_ttl_secs)?,
            },
            retry,
            jobs: JobsConfig {
                enabled: parse_or(&lookup, "JOBS_ENABLED", jobs_default.enabled)?,
                flush_interval: Duration::from_secs(parse_or(
                    &lookup,
                    "FLUSH_INTERVAL_SECS",
                    jobs_default.flush_interval.as_secs(),
                )?),
                warmup_weekday: parse_or(&lookup, "WARMUP_WEEKDAY", jobs_default.warmup_weekday)?,
                warmup_hour,
                warmup_minute,
                warmup_lock_ttl: Duration::from_secs(parse_or(
                    &lookup,
                    "WARMUP_LOCK_TTL_SECS",
                    jobs_default.warmup_lock_ttl.as_secs(),
                )?),
                visibility_interval: Duration::from_secs(parse_or(
                    &lookup,
                    "VISIBILITY_INTERVAL_SECS",
                    jobs_default.visibility_interval.as_secs(),
                )?),
                visibility_delay: Duration::from_secs(parse_or(
                    &lookup,
                    "VISIBILITY_DELAY_SECS",
                    jobs_default.visibility_delay.as_secs(),
                )?),
            },
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}
