//! Leader-guarded cache warmup
//!
//! Only the replica holding `lock:report_warmup:{partition}` rebuilds the
//! canonical page. Everyone else returns [`WarmupOutcome::Skipped`].

use async_trait::async_trait;
use tracing::{info, instrument, warn};

use tuning_core::{ReportQuery, ReportSnapshot};

use crate::services::{ServiceContext, ServiceResult};

use super::flush::FlushReconciler;
use super::scheduler::ScheduledJob;

/// What one warmup attempt did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarmupOutcome {
    /// Another replica holds the lock
    Skipped,
    /// The canonical page was rebuilt with `count` reports
    Populated { count: usize },
}

/// Warmup job
#[derive(Clone)]
pub struct WarmupJob {
    ctx: ServiceContext,
}

impl WarmupJob {
    pub fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    pub fn lock_key(&self) -> String {
        format!("lock:report_warmup:{}", self.ctx.partition())
    }

    #[instrument(skip(self), fields(partition = %self.ctx.partition()))]
    pub async fn run_once(&self) -> ServiceResult<WarmupOutcome> {
        let key = self.lock_key();
        let lock = self.ctx.leader_lock();

        let Some(token) = lock.try_acquire(&key, self.ctx.warmup_lock_ttl()).await? else {
            info!("Warmup lock held by another replica, skipping");
            return Ok(WarmupOutcome::Skipped);
        };

        let result = self.warm().await;

        match lock.release(&token).await {
            Ok(true) => {}
            Ok(false) => warn!(key = %key, "Warmup lock expired before release"),
            Err(e) => warn!(key = %key, error = %e, "Failed to release warmup lock"),
        }

        result
    }

    async fn warm(&self) -> ServiceResult<WarmupOutcome> {
        let cache = self.ctx.cache();

        if cache.get_page().await?.is_some() {
            // Fold pending drift into the database before the page is dropped
            let summary = FlushReconciler::new(self.ctx.clone()).run_once().await?;
            info!(reconciled = summary.reconciled, failed = summary.failed, "Flushed before warmup");
            cache.invalidate_page().await?;
        }

        let reports = self
            .ctx
            .report_repo()
            .find_page(&ReportQuery::canonical())
            .await?;
        let snapshots: Vec<ReportSnapshot> = reports.into_iter().map(ReportSnapshot::from).collect();

        if !snapshots.is_empty() {
            cache.set_page(&snapshots).await?;
        }

        info!(count = snapshots.len(), "Report page warmed");
        Ok(WarmupOutcome::Populated {
            count: snapshots.len(),
        })
    }
}

#[async_trait]
impl ScheduledJob for WarmupJob {
    fn name(&self) -> &'static str {
        "warmup"
    }

    async fn run(&self) -> ServiceResult<()> {
        self.run_once().await.map(|_| ())
    }
}
