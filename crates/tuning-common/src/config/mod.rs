//! Configuration structs

mod app_config;

pub use app_config::{
    AppConfig, AppSettings, CacheConfig, ConfigError, DatabaseConfig, Environment, JobsConfig,
    RedisConfig, RetryConfig, ServerConfig,
};
