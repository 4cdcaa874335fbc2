//! Redis `SET NX PX` leader lock.
//!
//! Acquisition never blocks: a held key means another replica is leading.
//! Release deletes the key only while it still carries our owner token, so
//! an expired lock re-acquired elsewhere is never released by the old owner.

use std::time::Duration;

use async_trait::async_trait;
use redis::Script;
use tracing::{debug, instrument};
use uuid::Uuid;

use tuning_core::{CacheResult, LeaderLock, LockToken};

use crate::pool::{RedisPool, RedisPoolError};
use crate::report::scripts;

#[derive(Clone)]
pub struct RedisLeaderLock {
    pool: RedisPool,
    release_script: Script,
}

impl RedisLeaderLock {
    pub fn new(pool: RedisPool) -> Self {
        Self {
            pool,
            release_script: scripts::release_lock(),
        }
    }
}

#[async_trait]
impl LeaderLock for RedisLeaderLock {
    #[instrument(skip(self))]
    async fn try_acquire(&self, key: &str, ttl: Duration) -> CacheResult<Option<LockToken>> {
        let owner = Uuid::new_v4().to_string();
        let ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1);

        let mut conn = self.pool.get().await?;
        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(&owner)
            .arg("NX")
            .arg("PX")
            .arg(ttl_ms)
            .query_async(&mut conn)
            .await
            .map_err(RedisPoolError::from)?;

        if reply.is_none() {
            debug!(key, "Lock held elsewhere");
            return Ok(None);
        }
        debug!(key, ttl_ms, "Lock acquired");
        Ok(Some(LockToken {
            key: key.to_string(),
            owner,
        }))
    }

    #[instrument(skip(self, token), fields(key = %token.key))]
    async fn release(&self, token: &LockToken) -> CacheResult<bool> {
        let mut conn = self.pool.get().await?;
        let deleted: i32 = self
            .release_script
            .key(&token.key)
            .arg(&token.owner)
            .invoke_async(&mut conn)
            .await
            .map_err(RedisPoolError::from)?;
        Ok(deleted == 1)
    }
}
