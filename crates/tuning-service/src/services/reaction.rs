//! Reaction mutator
//!
//! The only writer of reaction state. The database transaction (row lock,
//! row insert/delete, counter update) is authoritative; the cache is patched
//! afterwards on a best-effort basis and the report is marked dirty so the
//! flush job can repair any drift.

use tracing::{info, instrument, warn};

use tuning_core::{ReactionKind, ReportId, ToggleOutcome, UserId};

use crate::dto::ToggleReactionResponse;

use super::context::ServiceContext;
use super::error::{ServiceError, ServiceResult};

/// Reaction mutator
pub struct ReactionMutator<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> ReactionMutator<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Toggle one reaction kind for one user on one report
    ///
    /// Lock contention is retried with backoff per the context's
    /// [`RetryPolicy`](super::RetryPolicy); once the budget is spent the
    /// caller gets [`ServiceError::RetryableConflict`].
    #[instrument(skip(self, kind), fields(kind = kind.as_str()))]
    pub async fn toggle(
        &self,
        report_id: ReportId,
        user_id: UserId,
        kind: ReactionKind,
    ) -> ServiceResult<ToggleReactionResponse> {
        let outcome = self.toggle_with_retry(report_id, user_id, kind).await?;

        self.sync_cache(&outcome, user_id).await;

        info!(
            report_id = %report_id,
            user_id = %user_id,
            kind = kind.as_str(),
            reacted = outcome.reacted,
            count = outcome.count,
            "Reaction toggled"
        );

        Ok(outcome.into())
    }

    async fn toggle_with_retry(
        &self,
        report_id: ReportId,
        user_id: UserId,
        kind: ReactionKind,
    ) -> ServiceResult<ToggleOutcome> {
        let policy = self.ctx.retry_policy();
        let mut attempt = 1;

        loop {
            match self
                .ctx
                .report_repo()
                .toggle_reaction(report_id, user_id, kind)
                .await
            {
                Ok(outcome) => return Ok(outcome),
                Err(e) if e.is_retryable() && policy.allows_retry(attempt) => {
                    let delay = policy.delay_after(attempt);
                    warn!(
                        report_id = %report_id,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Report lock contended, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) if e.is_retryable() => {
                    warn!(report_id = %report_id, attempt, error = %e, "Retry budget exhausted");
                    return Err(ServiceError::RetryableConflict { attempts: attempt });
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Mirror a committed toggle into the cache. Never fails the request.
    async fn sync_cache(&self, outcome: &ToggleOutcome, user_id: UserId) {
        let cache = self.ctx.cache();
        let report_id = outcome.report_id;

        // Versioned, so a slower sync from an earlier toggle cannot win
        if let Err(e) = cache
            .set_user_reaction(
                report_id,
                user_id,
                outcome.kind,
                outcome.reacted,
                outcome.version,
            )
            .await
        {
            warn!(report_id = %report_id, user_id = %user_id, error = %e, "Failed to cache user reaction");
            // A stale flag would be written back by the flush job
            if let Err(e) = cache.evict_user_reactions(report_id, user_id).await {
                warn!(report_id = %report_id, user_id = %user_id, error = %e, "Failed to evict user reactions");
            }
        }

        if let Err(e) = cache
            .update_snapshot_count(report_id, outcome.kind, outcome.count)
            .await
        {
            warn!(report_id = %report_id, error = %e, "Failed to patch cached snapshot");
        }

        if let Err(e) = cache.mark_dirty(report_id).await {
            warn!(report_id = %report_id, error = %e, "Failed to mark report dirty");
        }
    }
}
