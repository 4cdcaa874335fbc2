//! Distributed leader lock port

use std::time::Duration;

use async_trait::async_trait;

use super::cache::CacheResult;

/// Proof of lock ownership, required to release it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockToken {
    pub key: String,
    /// Random owner value; only the holder of this value may release
    pub owner: String,
}

#[async_trait]
pub trait LeaderLock: Send + Sync {
    /// Non-blocking attempt; `None` when another owner holds the key
    async fn try_acquire(&self, key: &str, ttl: Duration) -> CacheResult<Option<LockToken>>;

    /// Release if still owned by `token`; `false` if it expired or changed hands
    async fn release(&self, token: &LockToken) -> CacheResult<bool>;
}
