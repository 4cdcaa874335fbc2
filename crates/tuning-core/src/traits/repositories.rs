//! Repository traits (ports) - define the interface for data access
//!
//! The Persistent Store is authoritative for reaction state. Every method that
//! mutates counters or reaction rows runs inside one transaction holding a
//! row lock on the report, so a counter change is never committed without its
//! paired row change.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::cache::UserReactionState;
use crate::entities::{ReactionCounts, ReactionKind, Report, ToggleOutcome};
use crate::error::DomainError;
use crate::value_objects::{ReactionSet, ReportId, UserId};

/// Result type for repository operations
pub type RepoResult<T> = Result<T, DomainError>;

/// Page size of the canonical cached listing
pub const DEFAULT_PAGE_SIZE: u32 = 10;
/// Largest page a caller may request
pub const MAX_PAGE_SIZE: u32 = 100;

/// Listing order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportSort {
    /// Most recent first
    #[default]
    Latest,
    Oldest,
}

impl std::str::FromStr for ReportSort {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "latest" => Ok(Self::Latest),
            "oldest" => Ok(Self::Oldest),
            other => Err(DomainError::ValidationError(format!("unknown sort: {other}"))),
        }
    }
}

/// Offset pagination query over listed reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportQuery {
    /// Zero-based page index
    pub page: u32,
    pub size: u32,
    pub sort: ReportSort,
}

impl Default for ReportQuery {
    fn default() -> Self {
        Self::canonical()
    }
}

impl ReportQuery {
    /// The single (page, size, sort) shape served from cache
    pub const fn canonical() -> Self {
        Self {
            page: 0,
            size: DEFAULT_PAGE_SIZE,
            sort: ReportSort::Latest,
        }
    }

    pub fn new(page: u32, size: u32, sort: ReportSort) -> Self {
        Self { page, size, sort }
    }

    /// Exactly `page == 0 && size == default && sort == latest`
    pub fn is_cache_eligible(&self) -> bool {
        *self == Self::canonical()
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page) * i64::from(self.size)
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.size.clamp(1, MAX_PAGE_SIZE))
    }
}

#[async_trait]
pub trait ReportRepository: Send + Sync {
    /// Find a listed (visible, not deleted) report
    async fn find_by_id(&self, id: ReportId) -> RepoResult<Option<Report>>;

    /// One page of listed reports
    async fn find_page(&self, query: &ReportQuery) -> RepoResult<Vec<Report>>;

    /// One page of listed reports with `user_id`'s reactions computed in the same query
    async fn find_page_with_reactions(
        &self,
        query: &ReportQuery,
        user_id: UserId,
    ) -> RepoResult<Vec<(Report, ReactionSet)>>;

    /// Batched lookup of one user's reactions; every requested id is present in the result
    async fn find_user_reactions(
        &self,
        user_id: UserId,
        report_ids: &[ReportId],
    ) -> RepoResult<HashMap<ReportId, ReactionSet>>;

    /// Toggle one reaction under a pessimistic row lock (single attempt).
    ///
    /// Contention surfaces as [`DomainError::LockContention`]; a missing or
    /// unlisted report as [`DomainError::ReportNotFound`].
    async fn toggle_reaction(
        &self,
        report_id: ReportId,
        user_id: UserId,
        kind: ReactionKind,
    ) -> RepoResult<ToggleOutcome>;

    /// Apply cached per-user reaction states to the reaction rows and
    /// re-derive the report's counters, under the row lock.
    ///
    /// Only flags that are current as of the report's reaction version
    /// (see [`UserReactionState::current_as_of`]) touch the rows, so a
    /// stale cached flag never overrides a committed toggle.
    async fn reconcile(
        &self,
        report_id: ReportId,
        states: &[UserReactionState],
    ) -> RepoResult<ReactionCounts>;

    /// Make generated reports created before `cutoff` visible; returns their ids
    async fn publish_pending(&self, cutoff: DateTime<Utc>) -> RepoResult<Vec<ReportId>>;
}
