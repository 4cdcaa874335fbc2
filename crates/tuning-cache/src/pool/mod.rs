//! Redis connection pool

mod redis_pool;

pub(crate) use redis_pool::ttl_secs;
pub use redis_pool::{RedisPool, RedisPoolConfig, RedisPoolError, RedisResult};
