//! PostgreSQL implementation of ReportRepository

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{debug, instrument};

use tuning_core::{
    DomainError, ReactionCounts, ReactionKind, ReactionSet, RepoResult, Report, ReportId, ReportQuery,
    ReportRepository, ReportSort, ToggleOutcome, UserId, UserReactionState,
};

use crate::mappers::{reaction_set_from_kinds, UserReactionBatch};
use crate::models::{
    ReactionCountsModel, ReportModel, ReportWithReactionsModel, UserReactionKindModel,
};

use super::error::{map_db_error, map_unique_violation, report_not_found};

const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_millis(3000);

const REPORT_COLUMNS: &str = "r.id, r.title, r.content, r.celebrate_count, r.thumbs_up_count, \
     r.laugh_count, r.eyes_count, r.heart_count, r.created_at, r.visible, r.deleted_at";

fn order_by(sort: ReportSort) -> &'static str {
    match sort {
        ReportSort::Latest => "r.created_at DESC, r.id DESC",
        ReportSort::Oldest => "r.created_at ASC, r.id ASC",
    }
}

/// PostgreSQL implementation of ReportRepository
#[derive(Clone)]
pub struct PgReportRepository {
    pool: PgPool,
    lock_timeout: Duration,
}

impl PgReportRepository {
    /// Create a new PgReportRepository
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }

    /// Bound on waiting for a report row lock before failing with contention
    pub fn with_lock_timeout(mut self, lock_timeout: Duration) -> Self {
        self.lock_timeout = lock_timeout;
        self
    }

    /// Open a transaction and take the report's row lock
    ///
    /// Returns the transaction and the report's current reaction version.
    /// Fails with `ReportNotFound` if the row is missing or soft-deleted.
    /// With `listed_only`, hidden reports count as missing too.
    async fn lock_report(
        &self,
        report_id: ReportId,
        listed_only: bool,
    ) -> RepoResult<(Transaction<'static, Postgres>, i64)> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        // SET does not accept bind parameters
        sqlx::query(&format!(
            "SET LOCAL lock_timeout = '{}ms'",
            self.lock_timeout.as_millis()
        ))
        .execute(&mut *tx)
        .await
        .map_err(map_db_error)?;

        let locked = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT reaction_version FROM reports
            WHERE id = $1 AND deleted_at IS NULL AND (visible OR NOT $2)
            FOR UPDATE
            "#,
        )
        .bind(report_id.into_inner())
        .bind(listed_only)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_db_error)?;

        match locked {
            Some(version) => Ok((tx, version)),
            None => Err(report_not_found(report_id)),
        }
    }
}

#[async_trait]
impl ReportRepository for PgReportRepository {
    #[instrument(skip(self))]
    async fn find_by_id(&self, id: ReportId) -> RepoResult<Option<Report>> {
        let result = sqlx::query_as::<_, ReportModel>(&format!(
            "SELECT {REPORT_COLUMNS} FROM reports r WHERE r.id = $1 AND r.deleted_at IS NULL"
        ))
        .bind(id.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.map(Report::from))
    }

    #[instrument(skip(self))]
    async fn find_page(&self, query: &ReportQuery) -> RepoResult<Vec<Report>> {
        let results = sqlx::query_as::<_, ReportModel>(&format!(
            r#"
            SELECT {REPORT_COLUMNS}
            FROM reports r
            WHERE r.visible AND r.deleted_at IS NULL
            ORDER BY {}
            LIMIT $1 OFFSET $2
            "#,
            order_by(query.sort)
        ))
        .bind(query.limit())
        .bind(query.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(results.into_iter().map(Report::from).collect())
    }

    #[instrument(skip(self))]
    async fn find_page_with_reactions(
        &self,
        query: &ReportQuery,
        user_id: UserId,
    ) -> RepoResult<Vec<(Report, ReactionSet)>> {
        let results = sqlx::query_as::<_, ReportWithReactionsModel>(&format!(
            r#"
            SELECT {REPORT_COLUMNS},
                   COALESCE(array_agg(ur.kind) FILTER (WHERE ur.kind IS NOT NULL), '{{}}'::text[])
                       AS my_reactions
            FROM reports r
            LEFT JOIN user_reactions ur ON ur.report_id = r.id AND ur.user_id = $1
            WHERE r.visible AND r.deleted_at IS NULL
            GROUP BY r.id
            ORDER BY {}
            LIMIT $2 OFFSET $3
            "#,
            order_by(query.sort)
        ))
        .bind(user_id.into_inner())
        .bind(query.limit())
        .bind(query.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(results.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self, report_ids), fields(reports = report_ids.len()))]
    async fn find_user_reactions(
        &self,
        user_id: UserId,
        report_ids: &[ReportId],
    ) -> RepoResult<HashMap<ReportId, ReactionSet>> {
        let mut result: HashMap<ReportId, ReactionSet> = report_ids
            .iter()
            .map(|id| (*id, ReactionSet::empty()))
            .collect();
        if report_ids.is_empty() {
            return Ok(result);
        }

        let ids: Vec<i64> = report_ids.iter().map(|id| id.into_inner()).collect();
        let rows = sqlx::query_as::<_, UserReactionKindModel>(
            r#"
            SELECT report_id, kind
            FROM user_reactions
            WHERE user_id = $1 AND report_id = ANY($2)
            "#,
        )
        .bind(user_id.into_inner())
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        for row in rows {
            let set = result
                .entry(ReportId::new(row.report_id))
                .or_insert_with(ReactionSet::empty);
            *set |= reaction_set_from_kinds(&[row.kind]);
        }
        Ok(result)
    }

    #[instrument(skip(self))]
    async fn toggle_reaction(
        &self,
        report_id: ReportId,
        user_id: UserId,
        kind: ReactionKind,
    ) -> RepoResult<ToggleOutcome> {
        let (mut tx, _) = self.lock_report(report_id, true).await?;
        let column = kind.column();

        let removed = sqlx::query(
            r#"
            DELETE FROM user_reactions
            WHERE report_id = $1 AND user_id = $2 AND kind = $3
            "#,
        )
        .bind(report_id.into_inner())
        .bind(user_id.into_inner())
        .bind(kind.as_str())
        .execute(&mut *tx)
        .await
        .map_err(map_db_error)?
        .rows_affected()
            > 0;

        let (count, version) = if removed {
            sqlx::query_as::<_, (i64, i64)>(&format!(
                "UPDATE reports SET {column} = GREATEST({column} - 1, 0), \
                 reaction_version = reaction_version + 1 \
                 WHERE id = $1 RETURNING {column}, reaction_version"
            ))
            .bind(report_id.into_inner())
            .fetch_one(&mut *tx)
            .await
            .map_err(map_db_error)?
        } else {
            sqlx::query(
                r#"
                INSERT INTO user_reactions (report_id, user_id, kind, created_at)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(report_id.into_inner())
            .bind(user_id.into_inner())
            .bind(kind.as_str())
            .bind(Utc::now())
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                map_unique_violation(e, || {
                    DomainError::LockContention(format!(
                        "concurrent reaction insert on report {report_id}"
                    ))
                })
            })?;

            sqlx::query_as::<_, (i64, i64)>(&format!(
                "UPDATE reports SET {column} = {column} + 1, \
                 reaction_version = reaction_version + 1 \
                 WHERE id = $1 RETURNING {column}, reaction_version"
            ))
            .bind(report_id.into_inner())
            .fetch_one(&mut *tx)
            .await
            .map_err(map_db_error)?
        };

        tx.commit().await.map_err(map_db_error)?;

        debug!(%report_id, %user_id, kind = kind.as_str(), reacted = !removed, count, version, "Reaction toggled");
        Ok(ToggleOutcome {
            report_id,
            kind,
            reacted: !removed,
            count,
            version,
        })
    }

    #[instrument(skip(self, states), fields(users = states.len()))]
    async fn reconcile(
        &self,
        report_id: ReportId,
        states: &[UserReactionState],
    ) -> RepoResult<ReactionCounts> {
        let (mut tx, report_version) = self.lock_report(report_id, false).await?;
        let batch = UserReactionBatch::from_states(states, report_version);
        debug!(
            %report_id,
            report_version,
            inserts = batch.insert_users.len(),
            deletes = batch.delete_users.len(),
            "Applying cached reaction states"
        );

        if !batch.insert_users.is_empty() {
            sqlx::query(
                r#"
                INSERT INTO user_reactions (report_id, user_id, kind)
                SELECT $1, t.user_id, t.kind
                FROM UNNEST($2::bigint[], $3::text[]) AS t(user_id, kind)
                ON CONFLICT (report_id, user_id, kind) DO NOTHING
                "#,
            )
            .bind(report_id.into_inner())
            .bind(&batch.insert_users)
            .bind(&batch.insert_kinds)
            .execute(&mut *tx)
            .await
            .map_err(map_db_error)?;
        }

        if !batch.delete_users.is_empty() {
            sqlx::query(
                r#"
                DELETE FROM user_reactions ur
                USING UNNEST($2::bigint[], $3::text[]) AS t(user_id, kind)
                WHERE ur.report_id = $1 AND ur.user_id = t.user_id AND ur.kind = t.kind
                "#,
            )
            .bind(report_id.into_inner())
            .bind(&batch.delete_users)
            .bind(&batch.delete_kinds)
            .execute(&mut *tx)
            .await
            .map_err(map_db_error)?;
        }

        // Counters are re-derived from the rows, never patched
        let counts = sqlx::query_as::<_, ReactionCountsModel>(
            r#"
            UPDATE reports r SET
                celebrate_count = c.celebrate,
                thumbs_up_count = c.thumbs_up,
                laugh_count = c.laugh,
                eyes_count = c.eyes,
                heart_count = c.heart
            FROM (
                SELECT
                    COUNT(*) FILTER (WHERE kind = 'CELEBRATE') AS celebrate,
                    COUNT(*) FILTER (WHERE kind = 'THUMBS_UP') AS thumbs_up,
                    COUNT(*) FILTER (WHERE kind = 'LAUGH') AS laugh,
                    COUNT(*) FILTER (WHERE kind = 'EYES') AS eyes,
                    COUNT(*) FILTER (WHERE kind = 'HEART') AS heart
                FROM user_reactions
                WHERE report_id = $1
            ) c
            WHERE r.id = $1
            RETURNING r.celebrate_count, r.thumbs_up_count, r.laugh_count, r.eyes_count, r.heart_count
            "#,
        )
        .bind(report_id.into_inner())
        .fetch_one(&mut *tx)
        .await
        .map_err(map_db_error)?;

        tx.commit().await.map_err(map_db_error)?;

        Ok(ReactionCounts::from(counts))
    }

    #[instrument(skip(self))]
    async fn publish_pending(&self, cutoff: DateTime<Utc>) -> RepoResult<Vec<ReportId>> {
        let ids = sqlx::query_scalar::<_, i64>(
            r#"
            UPDATE reports SET visible = TRUE
            WHERE NOT visible AND deleted_at IS NULL AND created_at <= $1
            RETURNING id
            "#,
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(ids.into_iter().map(ReportId::new).collect())
    }
}
