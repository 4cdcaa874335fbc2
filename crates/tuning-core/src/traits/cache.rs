//! Report cache port
//!
//! The cache is never the source of truth. Implementations report failures
//! as [`DomainError::CacheError`]; callers absorb them and fall back to the
//! repository.

use async_trait::async_trait;

use crate::entities::{ReactionCounts, ReactionKind, ReportSnapshot};
use crate::error::DomainError;
use crate::value_objects::{ReactionSet, ReportId, UserId};

/// Result type for cache operations
pub type CacheResult<T> = Result<T, DomainError>;

/// Tri-state answer for a single cached reaction flag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachedReaction {
    Reacted,
    NotReacted,
    /// No cached value; the caller must consult the database
    Unknown,
}

impl CachedReaction {
    pub fn from_flag(reacted: bool) -> Self {
        if reacted {
            Self::Reacted
        } else {
            Self::NotReacted
        }
    }

    pub fn as_bool(self) -> Option<bool> {
        match self {
            Self::Reacted => Some(true),
            Self::NotReacted => Some(false),
            Self::Unknown => None,
        }
    }
}

/// A dirty-set member together with the time it was (last) marked.
///
/// Clearing only succeeds while the mark time is unchanged, so a report
/// re-marked during reconciliation stays dirty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirtyMarker {
    pub report_id: ReportId,
    /// Unix epoch milliseconds
    pub marked_at: i64,
}

/// Version stamp of a flag copied from the database by a read path rather
/// than written after a committed toggle
pub const UNVERSIONED: i64 = 0;

/// Cached reaction flags of one user on one report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserReactionState {
    pub user_id: UserId,
    /// Kinds the cache has a value for
    pub known: ReactionSet,
    /// Kinds the cache says are reacted (subset of `known`)
    pub reacted: ReactionSet,
    /// Report reaction version that wrote each flag, by [`ReactionKind::index`]
    pub versions: [i64; 5],
}

impl UserReactionState {
    pub fn get(&self, kind: ReactionKind) -> CachedReaction {
        if !self.known.has(kind) {
            CachedReaction::Unknown
        } else {
            CachedReaction::from_flag(self.reacted.has(kind))
        }
    }

    pub fn version(&self, kind: ReactionKind) -> i64 {
        self.versions[kind.index()]
    }

    /// The flag, provided no toggle on the report committed after the one
    /// that wrote it. Read-path copies and superseded flags are `Unknown`.
    pub fn current_as_of(&self, kind: ReactionKind, report_version: i64) -> CachedReaction {
        let version = self.version(kind);
        if version == UNVERSIONED || version < report_version {
            CachedReaction::Unknown
        } else {
            self.get(kind)
        }
    }
}

#[async_trait]
pub trait ReportCache: Send + Sync {
    // === Canonical page ===

    /// Ordered report ids of the canonical page, `None` on miss
    async fn get_page(&self) -> CacheResult<Option<Vec<ReportId>>>;

    /// Snapshots for `ids`, position-aligned, `None` where missing
    async fn get_snapshots(&self, ids: &[ReportId]) -> CacheResult<Vec<Option<ReportSnapshot>>>;

    /// Atomically replace the page id list and its snapshots
    async fn set_page(&self, items: &[ReportSnapshot]) -> CacheResult<()>;

    /// Drop the page id list and its snapshots
    async fn invalidate_page(&self) -> CacheResult<()>;

    /// Overwrite one counter of an existing snapshot; `false` if not cached
    async fn update_snapshot_count(
        &self,
        report_id: ReportId,
        kind: ReactionKind,
        count: i64,
    ) -> CacheResult<bool>;

    /// Overwrite all counters of an existing snapshot; `false` if not cached
    async fn set_snapshot_counts(
        &self,
        report_id: ReportId,
        counts: &ReactionCounts,
    ) -> CacheResult<bool>;

    // === Per-user reactions ===

    async fn get_user_reaction(
        &self,
        report_id: ReportId,
        user_id: UserId,
        kind: ReactionKind,
    ) -> CacheResult<CachedReaction>;

    /// The user's flags on each report, position-aligned; `None` unless all
    /// five kinds are cached for that report
    async fn get_user_reactions_many(
        &self,
        report_ids: &[ReportId],
        user_id: UserId,
    ) -> CacheResult<Vec<Option<ReactionSet>>>;

    /// Record the flag written by the toggle that committed `version`.
    ///
    /// Returns `false` without writing when the cache already holds a flag
    /// from the same or a later toggle.
    async fn set_user_reaction(
        &self,
        report_id: ReportId,
        user_id: UserId,
        kind: ReactionKind,
        reacted: bool,
        version: i64,
    ) -> CacheResult<bool>;

    /// Fill in flags read from the database, leaving every kind that
    /// already has a value untouched. Stored as [`UNVERSIONED`].
    async fn set_user_reactions_if_absent(
        &self,
        report_id: ReportId,
        user_id: UserId,
        reactions: ReactionSet,
    ) -> CacheResult<()>;

    async fn evict_user_reactions(&self, report_id: ReportId, user_id: UserId) -> CacheResult<()>;

    /// Every user with a cached reaction entry for the report
    async fn cached_reaction_states(&self, report_id: ReportId) -> CacheResult<Vec<UserReactionState>>;

    // === Dirty tracking ===

    async fn mark_dirty(&self, report_id: ReportId) -> CacheResult<()>;

    /// Snapshot of the dirty set; markers stay until cleared
    async fn drain_dirty(&self) -> CacheResult<Vec<DirtyMarker>>;

    /// Remove the marker if it was not re-marked since it was drained
    async fn clear_dirty(&self, marker: &DirtyMarker) -> CacheResult<bool>;
}
