//! Visibility job
//!
//! Generated reports are stored hidden. Once they are older than the
//! configured delay they are published, the cached page is rebuilt on the
//! next read, and an alarm is queued per report.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeDelta, Utc};
use tracing::{info, instrument, warn};

use crate::services::{ServiceContext, ServiceError, ServiceResult};

use super::alarm::AlarmDispatcher;
use super::flush::FlushReconciler;
use super::scheduler::ScheduledJob;

/// Visibility job
#[derive(Clone)]
pub struct VisibilityJob {
    ctx: ServiceContext,
    delay: Duration,
    alarms: AlarmDispatcher,
}

impl VisibilityJob {
    pub fn new(ctx: ServiceContext, delay: Duration, alarms: AlarmDispatcher) -> Self {
        Self { ctx, delay, alarms }
    }

    /// Publish due reports; returns how many became visible
    #[instrument(skip(self))]
    pub async fn run_once(&self) -> ServiceResult<usize> {
        let delay = TimeDelta::from_std(self.delay)
            .map_err(|e| ServiceError::internal(format!("visibility delay out of range: {e}")))?;
        let cutoff = Utc::now() - delay;

        let published = self.ctx.report_repo().publish_pending(cutoff).await?;
        if published.is_empty() {
            return Ok(0);
        }
        info!(count = published.len(), "Reports published");

        // The dirty set is resolved against the current page, so flush before dropping it
        if let Err(e) = FlushReconciler::new(self.ctx.clone()).run_once().await {
            warn!(error = %e, "Flush before page invalidation failed");
        }
        if let Err(e) = self.ctx.cache().invalidate_page().await {
            warn!(error = %e, "Failed to invalidate report page");
        }

        for report_id in &published {
            self.alarms.notify(*report_id);
        }

        Ok(published.len())
    }
}

#[async_trait]
impl ScheduledJob for VisibilityJob {
    fn name(&self) -> &'static str {
        "visibility"
    }

    async fn run(&self) -> ServiceResult<()> {
        self.run_once().await.map(|_| ())
    }
}
