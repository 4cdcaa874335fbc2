//! # tuning-cache
//!
//! Redis caching layer for the report listing and reaction state.
//!
//! ## Features
//!
//! - **Connection Pool**: Managed Redis connection pool with deadpool
//! - **Report Cache**: canonical page id list, per-report snapshots,
//!   per-user reaction flags and the dirty set (`RedisReportCache`)
//! - **Leader Lock**: `SET NX PX` lock with owner-checked release (`RedisLeaderLock`)
//!
//! ## Example
//!
//! ```ignore
//! use tuning_cache::{RedisLeaderLock, RedisPool, RedisReportCache};
//!
//! let pool = RedisPool::from_config(&config.redis)?;
//! let cache = RedisReportCache::new(pool.clone(), &config.cache);
//! let lock = RedisLeaderLock::new(pool);
//!
//! if let Some(ids) = cache.get_page().await? {
//!     let snapshots = cache.get_snapshots(&ids).await?;
//! }
//! ```

pub mod keys;
pub mod lock;
pub mod pool;
pub mod report;

// Re-export pool types
pub use pool::{RedisPool, RedisPoolConfig, RedisPoolError, RedisResult};

pub use lock::RedisLeaderLock;
pub use report::{CacheTtls, RedisReportCache};
