//! Flush reconciler
//!
//! Walks the dirty set and re-aligns database rows, counters and cached
//! snapshots for every dirty report that sits on the cached page. Reports
//! off the page are skipped and stay dirty until a pass finds them cached.
//! A failure on one report is logged and leaves its marker in place for the
//! next pass.

use std::collections::HashSet;

use async_trait::async_trait;
use tracing::{debug, info, instrument, warn};

use tuning_core::{DirtyMarker, DomainError, ReportId};

use crate::services::{ServiceContext, ServiceResult};

use super::scheduler::ScheduledJob;

/// Result of one reconciliation pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushSummary {
    pub reconciled: usize,
    /// Not on the cached page (still dirty), or deleted (cleared)
    pub skipped: usize,
    /// Left dirty for the next pass
    pub failed: usize,
}

enum Reconciled {
    Done,
    Gone,
}

/// Flush reconciler
#[derive(Clone)]
pub struct FlushReconciler {
    ctx: ServiceContext,
}

impl FlushReconciler {
    pub fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    /// Reconcile every report currently in the dirty set
    #[instrument(skip(self))]
    pub async fn run_once(&self) -> ServiceResult<FlushSummary> {
        let cache = self.ctx.cache();
        let markers = cache.drain_dirty().await?;
        if markers.is_empty() {
            debug!("Dirty set empty");
            return Ok(FlushSummary::default());
        }

        let on_page: HashSet<ReportId> = cache
            .get_page()
            .await?
            .unwrap_or_default()
            .into_iter()
            .collect();

        let mut summary = FlushSummary::default();
        for marker in &markers {
            if !on_page.contains(&marker.report_id) {
                debug!(report_id = %marker.report_id, "Dirty report not on the cached page, skipping");
                summary.skipped += 1;
                continue;
            }

            match self.reconcile_report(marker).await {
                Ok(Reconciled::Done) => summary.reconciled += 1,
                // Deleted reports are never listed again
                Ok(Reconciled::Gone) => {
                    self.clear(marker).await;
                    summary.skipped += 1;
                }
                Err(e) => {
                    warn!(report_id = %marker.report_id, error = %e, "Reconciliation failed, report stays dirty");
                    summary.failed += 1;
                }
            }
        }

        info!(
            reconciled = summary.reconciled,
            skipped = summary.skipped,
            failed = summary.failed,
            "Flush pass finished"
        );
        Ok(summary)
    }

    async fn reconcile_report(&self, marker: &DirtyMarker) -> Result<Reconciled, DomainError> {
        let report_id = marker.report_id;
        let cache = self.ctx.cache();

        let states = cache.cached_reaction_states(report_id).await?;
        let counts = match self.ctx.report_repo().reconcile(report_id, &states).await {
            Ok(counts) => counts,
            Err(e) if e.is_not_found() => return Ok(Reconciled::Gone),
            Err(e) => return Err(e),
        };

        cache.set_snapshot_counts(report_id, &counts).await?;

        if !cache.clear_dirty(marker).await? {
            debug!(report_id = %report_id, "Report re-marked during reconciliation");
        }
        debug!(report_id = %report_id, users = states.len(), total = counts.total(), "Report reconciled");
        Ok(Reconciled::Done)
    }

    async fn clear(&self, marker: &DirtyMarker) {
        if let Err(e) = self.ctx.cache().clear_dirty(marker).await {
            warn!(report_id = %marker.report_id, error = %e, "Failed to clear dirty marker");
        }
    }
}

#[async_trait]
impl ScheduledJob for FlushReconciler {
    fn name(&self) -> &'static str {
        "flush_reconciler"
    }

    async fn run(&self) -> ServiceResult<()> {
        self.run_once().await.map(|_| ())
    }
}
