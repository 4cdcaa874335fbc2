//! In-memory port implementations for service tests
//!
//! The repository serializes every mutation behind one async mutex, which
//! stands in for the row lock. Every repository call yields once so
//! concurrently polled futures interleave the way real I/O would.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::Mutex;

use tuning_core::{
    AlarmSink, CacheResult, CachedReaction, DirtyMarker, DomainError, LeaderLock, LockToken,
    ReactionCounts, ReactionKind, ReactionSet, RepoResult, Report, ReportCache, ReportId,
    ReportQuery, ReportRepository, ReportSnapshot, ReportSort, ToggleOutcome, UserId,
    UserReactionState, UNVERSIONED,
};
use tuning_service::{RetryPolicy, ServiceContext};

// ============================================================================
// Repository
// ============================================================================

#[derive(Default)]
struct Store {
    reports: BTreeMap<ReportId, Report>,
    rows: HashSet<(ReportId, UserId, ReactionKind)>,
    /// Reaction version per report, bumped by every toggle
    versions: HashMap<ReportId, i64>,
}

impl Store {
    fn listed(&self, id: ReportId) -> Option<&Report> {
        self.reports.get(&id).filter(|r| r.is_listed())
    }

    fn reactions_of(&self, report_id: ReportId, user_id: UserId) -> ReactionSet {
        ReactionKind::ALL
            .into_iter()
            .filter(|k| self.rows.contains(&(report_id, user_id, *k)))
            .collect()
    }

    fn page(&self, query: &ReportQuery) -> Vec<Report> {
        let mut listed: Vec<&Report> = self.reports.values().filter(|r| r.is_listed()).collect();
        listed.sort_by_key(|r| (r.created_at, r.id));
        if query.sort == ReportSort::Latest {
            listed.reverse();
        }
        listed
            .into_iter()
            .skip(query.offset() as usize)
            .take(query.limit() as usize)
            .cloned()
            .collect()
    }
}

#[derive(Default)]
pub struct InMemoryReportRepository {
    store: tokio::sync::Mutex<Store>,
    contention_left: AtomicU32,
    failing_reconcile: Mutex<HashSet<ReportId>>,

    pub page_queries: AtomicUsize,
    pub user_reaction_queries: AtomicUsize,
    pub toggle_calls: AtomicUsize,
    pub reconcile_calls: AtomicUsize,
}

impl InMemoryReportRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a report; `age` is how long ago it was generated
    pub async fn insert(&self, id: i64, age: Duration, visible: bool) {
        let created_at = Utc::now() - TimeDelta::from_std(age).unwrap();
        let report = Report {
            id: ReportId::new(id),
            title: format!("Report {id}"),
            content: format!("Tuning advice #{id}"),
            counts: ReactionCounts::default(),
            created_at,
            visible,
            deleted_at: None,
        };
        self.store.lock().await.reports.insert(report.id, report);
    }

    /// Listed reports `1..=n`, higher ids are newer
    pub async fn seed(&self, n: i64) {
        for id in 1..=n {
            self.insert(id, Duration::from_secs(((n - id + 1) * 60) as u64), true)
                .await;
        }
    }

    pub async fn soft_delete(&self, id: i64) {
        if let Some(report) = self.store.lock().await.reports.get_mut(&ReportId::new(id)) {
            report.deleted_at = Some(Utc::now());
        }
    }

    pub async fn report(&self, id: i64) -> Option<Report> {
        self.store.lock().await.reports.get(&ReportId::new(id)).cloned()
    }

    pub async fn counts(&self, id: i64) -> ReactionCounts {
        self.report(id).await.map(|r| r.counts).unwrap_or_default()
    }

    pub async fn has_row(&self, report: i64, user: i64, kind: ReactionKind) -> bool {
        self.store
            .lock()
            .await
            .rows
            .contains(&(ReportId::new(report), UserId::new(user), kind))
    }

    pub async fn reaction_version(&self, report: i64) -> i64 {
        self.store
            .lock()
            .await
            .versions
            .get(&ReportId::new(report))
            .copied()
            .unwrap_or(0)
    }

    pub async fn row_count(&self, report: i64, kind: ReactionKind) -> usize {
        let id = ReportId::new(report);
        self.store
            .lock()
            .await
            .rows
            .iter()
            .filter(|(r, _, k)| *r == id && *k == kind)
            .count()
    }

    /// The next `n` toggle attempts fail with lock contention
    pub fn contend_next(&self, n: u32) {
        self.contention_left.store(n, Ordering::SeqCst);
    }

    pub fn fail_reconcile(&self, id: i64, failing: bool) {
        let mut set = self.failing_reconcile.lock();
        if failing {
            set.insert(ReportId::new(id));
        } else {
            set.remove(&ReportId::new(id));
        }
    }
}

#[async_trait]
impl ReportRepository for InMemoryReportRepository {
    async fn find_by_id(&self, id: ReportId) -> RepoResult<Option<Report>> {
        tokio::task::yield_now().await;
        Ok(self.store.lock().await.listed(id).cloned())
    }

    async fn find_page(&self, query: &ReportQuery) -> RepoResult<Vec<Report>> {
        tokio::task::yield_now().await;
        self.page_queries.fetch_add(1, Ordering::SeqCst);
        Ok(self.store.lock().await.page(query))
    }

    async fn find_page_with_reactions(
        &self,
        query: &ReportQuery,
        user_id: UserId,
    ) -> RepoResult<Vec<(Report, ReactionSet)>> {
        tokio::task::yield_now().await;
        self.page_queries.fetch_add(1, Ordering::SeqCst);
        let store = self.store.lock().await;
        Ok(store
            .page(query)
            .into_iter()
            .map(|r| {
                let mine = store.reactions_of(r.id, user_id);
                (r, mine)
            })
            .collect())
    }

    async fn find_user_reactions(
        &self,
        user_id: UserId,
        report_ids: &[ReportId],
    ) -> RepoResult<HashMap<ReportId, ReactionSet>> {
        tokio::task::yield_now().await;
        self.user_reaction_queries.fetch_add(1, Ordering::SeqCst);
        let store = self.store.lock().await;
        Ok(report_ids
            .iter()
            .map(|id| (*id, store.reactions_of(*id, user_id)))
            .collect())
    }

    async fn toggle_reaction(
        &self,
        report_id: ReportId,
        user_id: UserId,
        kind: ReactionKind,
    ) -> RepoResult<ToggleOutcome> {
        tokio::task::yield_now().await;
        self.toggle_calls.fetch_add(1, Ordering::SeqCst);

        let contended = self
            .contention_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if contended {
            return Err(DomainError::LockContention("lock timeout".to_string()));
        }

        let mut store = self.store.lock().await;
        if store.listed(report_id).is_none() {
            return Err(DomainError::ReportNotFound(report_id));
        }

        let reacted = if store.rows.remove(&(report_id, user_id, kind)) {
            false
        } else {
            store.rows.insert((report_id, user_id, kind));
            true
        };

        let report = store
            .reports
            .get_mut(&report_id)
            .ok_or(DomainError::ReportNotFound(report_id))?;
        let count = if reacted {
            report.counts.increment(kind)
        } else {
            report.counts.decrement(kind)
        };
        let version = store.versions.entry(report_id).or_insert(0);
        *version += 1;

        Ok(ToggleOutcome {
            report_id,
            kind,
            reacted,
            count,
            version: *version,
        })
    }

    async fn reconcile(
        &self,
        report_id: ReportId,
        states: &[UserReactionState],
    ) -> RepoResult<ReactionCounts> {
        tokio::task::yield_now().await;
        self.reconcile_calls.fetch_add(1, Ordering::SeqCst);

        if self.failing_reconcile.lock().contains(&report_id) {
            return Err(DomainError::DatabaseError("connection reset".to_string()));
        }

        let mut store = self.store.lock().await;
        match store.reports.get(&report_id) {
            Some(r) if r.deleted_at.is_none() => {}
            _ => return Err(DomainError::ReportNotFound(report_id)),
        }

        let report_version = store.versions.get(&report_id).copied().unwrap_or(0);
        for state in states {
            for kind in state.known.kinds() {
                let key = (report_id, state.user_id, kind);
                match state.current_as_of(kind, report_version) {
                    CachedReaction::Reacted => {
                        store.rows.insert(key);
                    }
                    CachedReaction::NotReacted => {
                        store.rows.remove(&key);
                    }
                    CachedReaction::Unknown => {}
                }
            }
        }

        let mut counts = ReactionCounts::default();
        for (r, _, kind) in &store.rows {
            if *r == report_id {
                counts.increment(*kind);
            }
        }
        if let Some(report) = store.reports.get_mut(&report_id) {
            report.counts = counts;
        }
        Ok(counts)
    }

    async fn publish_pending(&self, cutoff: DateTime<Utc>) -> RepoResult<Vec<ReportId>> {
        tokio::task::yield_now().await;
        let mut store = self.store.lock().await;
        let mut published = Vec::new();
        for report in store.reports.values_mut() {
            if !report.visible && report.deleted_at.is_none() && report.created_at <= cutoff {
                report.visible = true;
                published.push(report.id);
            }
        }
        Ok(published)
    }
}

// ============================================================================
// Cache
// ============================================================================

#[derive(Default)]
struct CacheState {
    page: Option<Vec<ReportId>>,
    snapshots: HashMap<ReportId, ReportSnapshot>,
    reactions: HashMap<(ReportId, UserId), UserReactionState>,
    /// Entries written by a toggle; read-path copies are not listed
    reaction_users: HashSet<(ReportId, UserId)>,
    dirty: HashMap<ReportId, i64>,
    clock: i64,
}

fn empty_state(user_id: UserId) -> UserReactionState {
    UserReactionState {
        user_id,
        known: ReactionSet::empty(),
        reacted: ReactionSet::empty(),
        versions: [UNVERSIONED; 5],
    }
}

#[derive(Default)]
pub struct InMemoryReportCache {
    state: Mutex<CacheState>,
    unavailable: AtomicBool,
    pub set_page_calls: AtomicUsize,
    pub user_reaction_reads: AtomicUsize,
}

impl InMemoryReportCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_unavailable(&self, down: bool) {
        self.unavailable.store(down, Ordering::SeqCst);
    }

    fn check(&self) -> CacheResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(DomainError::CacheError("connection refused".to_string()))
        } else {
            Ok(())
        }
    }

    pub fn cached_page(&self) -> Option<Vec<ReportId>> {
        self.state.lock().page.clone()
    }

    pub fn snapshot(&self, id: i64) -> Option<ReportSnapshot> {
        self.state.lock().snapshots.get(&ReportId::new(id)).cloned()
    }

    pub fn is_dirty(&self, id: i64) -> bool {
        self.state.lock().dirty.contains_key(&ReportId::new(id))
    }

    pub fn cached_flag(&self, report: i64, user: i64, kind: ReactionKind) -> CachedReaction {
        let state = self.state.lock();
        state
            .reactions
            .get(&(ReportId::new(report), UserId::new(user)))
            .map_or(CachedReaction::Unknown, |entry| entry.get(kind))
    }

    /// Overwrite one flag regardless of version, as a lost or reordered
    /// write would leave it
    pub fn force_flag(&self, report: i64, user: i64, kind: ReactionKind, reacted: bool, version: i64) {
        let (report_id, user_id) = (ReportId::new(report), UserId::new(user));
        let mut state = self.state.lock();
        let entry = state
            .reactions
            .entry((report_id, user_id))
            .or_insert_with(|| empty_state(user_id));
        entry.known |= kind.flag();
        entry.reacted.set(kind.flag(), reacted);
        entry.versions[kind.index()] = version;
        state.reaction_users.insert((report_id, user_id));
    }
}

#[async_trait]
impl ReportCache for InMemoryReportCache {
    async fn get_page(&self) -> CacheResult<Option<Vec<ReportId>>> {
        self.check()?;
        Ok(self.state.lock().page.clone())
    }

    async fn get_snapshots(&self, ids: &[ReportId]) -> CacheResult<Vec<Option<ReportSnapshot>>> {
        self.check()?;
        let state = self.state.lock();
        Ok(ids.iter().map(|id| state.snapshots.get(id).cloned()).collect())
    }

    async fn set_page(&self, items: &[ReportSnapshot]) -> CacheResult<()> {
        self.check()?;
        self.set_page_calls.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock();
        state.page = Some(items.iter().map(|s| s.id).collect());
        for item in items {
            state.snapshots.insert(item.id, item.clone());
        }
        Ok(())
    }

    async fn invalidate_page(&self) -> CacheResult<()> {
        self.check()?;
        let mut state = self.state.lock();
        if let Some(ids) = state.page.take() {
            for id in ids {
                state.snapshots.remove(&id);
            }
        }
        Ok(())
    }

    async fn update_snapshot_count(
        &self,
        report_id: ReportId,
        kind: ReactionKind,
        count: i64,
    ) -> CacheResult<bool> {
        self.check()?;
        let mut state = self.state.lock();
        Ok(match state.snapshots.get_mut(&report_id) {
            Some(snapshot) => {
                snapshot.counts.set(kind, count);
                true
            }
            None => false,
        })
    }

    async fn set_snapshot_counts(
        &self,
        report_id: ReportId,
        counts: &ReactionCounts,
    ) -> CacheResult<bool> {
        self.check()?;
        let mut state = self.state.lock();
        Ok(match state.snapshots.get_mut(&report_id) {
            Some(snapshot) => {
                snapshot.counts = *counts;
                true
            }
            None => false,
        })
    }

    async fn get_user_reaction(
        &self,
        report_id: ReportId,
        user_id: UserId,
        kind: ReactionKind,
    ) -> CacheResult<CachedReaction> {
        self.check()?;
        Ok(self.cached_flag(report_id.into_inner(), user_id.into_inner(), kind))
    }

    async fn get_user_reactions_many(
        &self,
        report_ids: &[ReportId],
        user_id: UserId,
    ) -> CacheResult<Vec<Option<ReactionSet>>> {
        self.check()?;
        self.user_reaction_reads.fetch_add(1, Ordering::SeqCst);
        let state = self.state.lock();
        Ok(report_ids
            .iter()
            .map(|id| {
                state
                    .reactions
                    .get(&(*id, user_id))
                    .filter(|entry| entry.known.is_all())
                    .map(|entry| entry.reacted)
            })
            .collect())
    }

    async fn set_user_reaction(
        &self,
        report_id: ReportId,
        user_id: UserId,
        kind: ReactionKind,
        reacted: bool,
        version: i64,
    ) -> CacheResult<bool> {
        self.check()?;
        let mut state = self.state.lock();
        let entry = state
            .reactions
            .entry((report_id, user_id))
            .or_insert_with(|| empty_state(user_id));
        if entry.known.has(kind) && entry.version(kind) >= version {
            return Ok(false);
        }
        entry.known |= kind.flag();
        entry.reacted.set(kind.flag(), reacted);
        entry.versions[kind.index()] = version;
        state.reaction_users.insert((report_id, user_id));
        Ok(true)
    }

    async fn set_user_reactions_if_absent(
        &self,
        report_id: ReportId,
        user_id: UserId,
        reactions: ReactionSet,
    ) -> CacheResult<()> {
        self.check()?;
        let mut state = self.state.lock();
        let entry = state
            .reactions
            .entry((report_id, user_id))
            .or_insert_with(|| empty_state(user_id));
        for kind in ReactionKind::ALL {
            if !entry.known.has(kind) {
                entry.known |= kind.flag();
                entry.reacted.set(kind.flag(), reactions.has(kind));
                entry.versions[kind.index()] = UNVERSIONED;
            }
        }
        Ok(())
    }

    async fn evict_user_reactions(&self, report_id: ReportId, user_id: UserId) -> CacheResult<()> {
        self.check()?;
        let mut state = self.state.lock();
        state.reactions.remove(&(report_id, user_id));
        state.reaction_users.remove(&(report_id, user_id));
        Ok(())
    }

    async fn cached_reaction_states(&self, report_id: ReportId) -> CacheResult<Vec<UserReactionState>> {
        self.check()?;
        let state = self.state.lock();
        Ok(state
            .reaction_users
            .iter()
            .filter(|(r, _)| *r == report_id)
            .filter_map(|key| state.reactions.get(key).copied())
            .collect())
    }

    async fn mark_dirty(&self, report_id: ReportId) -> CacheResult<()> {
        self.check()?;
        let mut state = self.state.lock();
        state.clock += 1;
        let marked_at = state.clock;
        state.dirty.insert(report_id, marked_at);
        Ok(())
    }

    async fn drain_dirty(&self) -> CacheResult<Vec<DirtyMarker>> {
        self.check()?;
        let state = self.state.lock();
        let mut markers: Vec<DirtyMarker> = state
            .dirty
            .iter()
            .map(|(report_id, marked_at)| DirtyMarker {
                report_id: *report_id,
                marked_at: *marked_at,
            })
            .collect();
        markers.sort_by_key(|m| m.marked_at);
        Ok(markers)
    }

    async fn clear_dirty(&self, marker: &DirtyMarker) -> CacheResult<bool> {
        self.check()?;
        let mut state = self.state.lock();
        if state.dirty.get(&marker.report_id) == Some(&marker.marked_at) {
            state.dirty.remove(&marker.report_id);
            Ok(true)
        } else {
            Ok(false)
        }
    }
}

// ============================================================================
// Leader lock
// ============================================================================

#[derive(Default)]
pub struct InMemoryLeaderLock {
    held: Mutex<HashMap<String, String>>,
    next_owner: AtomicU64,
}

impl InMemoryLeaderLock {
    pub fn is_held(&self, key: &str) -> bool {
        self.held.lock().contains_key(key)
    }
}

#[async_trait]
impl LeaderLock for InMemoryLeaderLock {
    async fn try_acquire(&self, key: &str, _ttl: Duration) -> CacheResult<Option<LockToken>> {
        let mut held = self.held.lock();
        if held.contains_key(key) {
            return Ok(None);
        }
        let owner = format!("owner-{}", self.next_owner.fetch_add(1, Ordering::SeqCst));
        held.insert(key.to_string(), owner.clone());
        Ok(Some(LockToken {
            key: key.to_string(),
            owner,
        }))
    }

    async fn release(&self, token: &LockToken) -> CacheResult<bool> {
        let mut held = self.held.lock();
        if held.get(&token.key) == Some(&token.owner) {
            held.remove(&token.key);
            Ok(true)
        } else {
            Ok(false)
        }
    }
}

// ============================================================================
// Alarm sink
// ============================================================================

#[derive(Default)]
pub struct RecordingAlarmSink {
    pub published: Mutex<Vec<ReportId>>,
}

#[async_trait]
impl AlarmSink for RecordingAlarmSink {
    async fn report_published(&self, report_id: ReportId) -> Result<(), DomainError> {
        self.published.lock().push(report_id);
        Ok(())
    }
}

// ============================================================================
// Harness
// ============================================================================

/// One "deployment": shared repository, cache and lock behind a context
pub struct Harness {
    pub repo: Arc<InMemoryReportRepository>,
    pub cache: Arc<InMemoryReportCache>,
    pub lock: Arc<InMemoryLeaderLock>,
    pub ctx: ServiceContext,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_retry(RetryPolicy::new(3, Duration::from_millis(1), 2))
    }

    pub fn with_retry(policy: RetryPolicy) -> Self {
        let repo = Arc::new(InMemoryReportRepository::new());
        let cache = Arc::new(InMemoryReportCache::new());
        let lock = Arc::new(InMemoryLeaderLock::default());
        let ctx = ServiceContext::builder()
            .report_repo(repo.clone())
            .cache(cache.clone())
            .leader_lock(lock.clone())
            .retry_policy(policy)
            .build()
            .expect("all ports provided");
        Self {
            repo,
            cache,
            lock,
            ctx,
        }
    }

    /// A second replica sharing this harness's database, cache and lock
    pub fn replica(&self) -> ServiceContext {
        self.ctx.clone()
    }
}
