//! Report query router
//!
//! Only the canonical query (first page, default size, latest first) is
//! served from the cache. Everything else, and any request that finds the
//! cache unreachable, reads the database directly with the caller's
//! reactions joined in.

use tracing::{debug, instrument, warn};

use tuning_core::{
    CacheResult, ReactionSet, Report, ReportId, ReportQuery, ReportSnapshot, UserId,
};

use crate::dto::{ReportPageResponse, ReportResponse};

use super::context::ServiceContext;
use super::error::ServiceResult;

/// Report query router
pub struct ReportQueryRouter<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> ReportQueryRouter<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Fetch one page of reports enriched with `user_id`'s own reactions
    #[instrument(skip(self))]
    pub async fn fetch_page(
        &self,
        query: ReportQuery,
        user_id: UserId,
    ) -> ServiceResult<ReportPageResponse> {
        let items = if query.is_cache_eligible() {
            self.fetch_canonical(&query, user_id).await?
        } else {
            self.fetch_direct(&query, user_id).await?
        };
        Ok(ReportPageResponse::new(items, &query))
    }

    async fn fetch_canonical(
        &self,
        query: &ReportQuery,
        user_id: UserId,
    ) -> ServiceResult<Vec<ReportResponse>> {
        let snapshots = match self.read_cached_page().await {
            Ok(Some(snapshots)) => {
                debug!(count = snapshots.len(), "Report page cache hit");
                snapshots
            }
            Ok(None) => {
                debug!("Report page cache miss");
                self.load_and_cache_page(query).await?
            }
            Err(e) => {
                warn!(error = %e, "Report cache unavailable, reading database");
                return self.fetch_direct(query, user_id).await;
            }
        };

        self.enrich(snapshots, user_id).await
    }

    /// `Ok(None)` on a miss, including a page whose snapshots partly expired
    async fn read_cached_page(&self) -> CacheResult<Option<Vec<ReportSnapshot>>> {
        let cache = self.ctx.cache();
        let Some(ids) = cache.get_page().await? else {
            return Ok(None);
        };
        let snapshots = cache.get_snapshots(&ids).await?;
        Ok(snapshots.into_iter().collect::<Option<Vec<_>>>())
    }

    async fn load_and_cache_page(&self, query: &ReportQuery) -> ServiceResult<Vec<ReportSnapshot>> {
        let reports = self.ctx.report_repo().find_page(query).await?;
        let snapshots: Vec<ReportSnapshot> = reports.into_iter().map(ReportSnapshot::from).collect();

        // An empty page is not cached; the next request simply asks again
        if !snapshots.is_empty() {
            if let Err(e) = self.ctx.cache().set_page(&snapshots).await {
                warn!(error = %e, "Failed to populate report page cache");
            }
        }
        Ok(snapshots)
    }

    /// Attach the caller's reactions, falling back to one batched database
    /// lookup when any report's flags are not fully cached
    async fn enrich(
        &self,
        snapshots: Vec<ReportSnapshot>,
        user_id: UserId,
    ) -> ServiceResult<Vec<ReportResponse>> {
        let cache = self.ctx.cache();
        let ids: Vec<ReportId> = snapshots.iter().map(|s| s.id).collect();

        let (mut cached, mut cache_up) = match cache.get_user_reactions_many(&ids, user_id).await {
            Ok(flags) => (flags, true),
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "Failed to read cached reactions");
                (vec![None; ids.len()], false)
            }
        };

        if cached.iter().any(Option::is_none) {
            let stored = self
                .ctx
                .report_repo()
                .find_user_reactions(user_id, &ids)
                .await?;

            for (slot, id) in cached.iter_mut().zip(&ids) {
                if slot.is_some() {
                    continue;
                }
                let flags = stored.get(id).copied().unwrap_or_default();
                // Fills gaps only: a toggle may have cached newer flags since the read
                if cache_up {
                    if let Err(e) = cache.set_user_reactions_if_absent(*id, user_id, flags).await {
                        warn!(report_id = %id, user_id = %user_id, error = %e, "Failed to backfill cached reactions");
                        cache_up = false;
                    }
                }
                *slot = Some(flags);
            }
        }

        Ok(snapshots
            .into_iter()
            .zip(cached)
            .map(|(snapshot, flags)| ReportResponse::from_snapshot(snapshot, flags.unwrap_or_default()))
            .collect())
    }

    async fn fetch_direct(
        &self,
        query: &ReportQuery,
        user_id: UserId,
    ) -> ServiceResult<Vec<ReportResponse>> {
        let rows = self
            .ctx
            .report_repo()
            .find_page_with_reactions(query, user_id)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(report, mine): (Report, ReactionSet)| {
                ReportResponse::from_snapshot(report.into(), mine)
            })
            .collect())
    }
}
