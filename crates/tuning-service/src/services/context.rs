//! Service context - dependency container for services and jobs
//!
//! Holds the port implementations (database, cache, leader lock) and the
//! tunables the request path and the scheduled jobs share.

use std::sync::Arc;
use std::time::Duration;

use tuning_common::AppConfig;
use tuning_core::{LeaderLock, Partition, ReportCache, ReportRepository};

use super::error::{ServiceError, ServiceResult};
use super::retry::RetryPolicy;

/// Default TTL of the warmup leader lock
const DEFAULT_WARMUP_LOCK_TTL: Duration = Duration::from_secs(60);

/// Service context containing all dependencies
///
/// Cheap to clone; every dependency is behind an `Arc`.
#[derive(Clone)]
pub struct ServiceContext {
    report_repo: Arc<dyn ReportRepository>,
    cache: Arc<dyn ReportCache>,
    leader_lock: Arc<dyn LeaderLock>,

    retry_policy: RetryPolicy,
    partition: Partition,
    warmup_lock_ttl: Duration,
}

impl ServiceContext {
    pub fn builder() -> ServiceContextBuilder {
        ServiceContextBuilder::default()
    }

    // === Ports ===

    /// Authoritative report store
    pub fn report_repo(&self) -> &dyn ReportRepository {
        self.report_repo.as_ref()
    }

    pub fn cache(&self) -> &dyn ReportCache {
        self.cache.as_ref()
    }

    pub fn leader_lock(&self) -> &dyn LeaderLock {
        self.leader_lock.as_ref()
    }

    // === Tunables ===

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry_policy
    }

    pub fn partition(&self) -> &Partition {
        &self.partition
    }

    pub fn warmup_lock_ttl(&self) -> Duration {
        self.warmup_lock_ttl
    }
}

/// Builder for ServiceContext
#[derive(Default)]
pub struct ServiceContextBuilder {
    report_repo: Option<Arc<dyn ReportRepository>>,
    cache: Option<Arc<dyn ReportCache>>,
    leader_lock: Option<Arc<dyn LeaderLock>>,
    retry_policy: Option<RetryPolicy>,
    partition: Option<Partition>,
    warmup_lock_ttl: Option<Duration>,
}

impl ServiceContextBuilder {
    pub fn report_repo(mut self, repo: Arc<dyn ReportRepository>) -> Self {
        self.report_repo = Some(repo);
        self
    }

    pub fn cache(mut self, cache: Arc<dyn ReportCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn leader_lock(mut self, lock: Arc<dyn LeaderLock>) -> Self {
        self.leader_lock = Some(lock);
        self
    }

    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = Some(policy);
        self
    }

    pub fn partition(mut self, partition: Partition) -> Self {
        self.partition = Some(partition);
        self
    }

    pub fn warmup_lock_ttl(mut self, ttl: Duration) -> Self {
        self.warmup_lock_ttl = Some(ttl);
        self
    }

    /// Take retry, partition and lock TTL settings from the application config
    pub fn with_config(self, config: &AppConfig) -> Self {
        self.retry_policy(RetryPolicy::from(&config.retry))
            .partition(config.cache.partition.clone())
            .warmup_lock_ttl(config.jobs.warmup_lock_ttl)
    }

    /// Build the ServiceContext
    pub fn build(self) -> ServiceResult<ServiceContext> {
        Ok(ServiceContext {
            report_repo: self
                .report_repo
                .ok_or_else(|| ServiceError::validation("report_repo is required"))?,
            cache: self
                .cache
                .ok_or_else(|| ServiceError::validation("cache is required"))?,
            leader_lock: self
                .leader_lock
                .ok_or_else(|| ServiceError::validation("leader_lock is required"))?,
            retry_policy: self.retry_policy.unwrap_or_default(),
            partition: self.partition.unwrap_or_default(),
            warmup_lock_ttl: self.warmup_lock_ttl.unwrap_or(DEFAULT_WARMUP_LOCK_TTL),
        })
    }
}
