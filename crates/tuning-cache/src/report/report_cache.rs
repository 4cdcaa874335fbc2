//! Redis implementation of the report cache port.
//!
//! Layout (see [`crate::keys`]):
//! - `report_page:{partition}`: list of report ids, canonical page order
//! - `report_snapshot:{id}`: hash of title/content/created_at and five counters
//! - `report_reaction:{id}:{user}`: hash of kind -> `flag:version`, flag "1"/"0"
//! - `report_reaction_users:{id}`: set of users with a reaction hash on the report
//! - `report_dirty`: sorted set of report ids, scored by last mark time (ms)

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use redis::{AsyncCommands, Script};
use tracing::{debug, instrument, warn};

use tuning_common::CacheConfig;
use tuning_core::{
    CacheResult, CachedReaction, DirtyMarker, Partition, ReactionCounts, ReactionKind,
    ReactionSet, ReportCache, ReportId, ReportSnapshot, UserId, UserReactionState, UNVERSIONED,
};

use super::{scripts, snapshot};
use crate::keys;
use crate::pool::{ttl_secs, RedisPool, RedisPoolError};

const REACTED: &str = "1";
const NOT_REACTED: &str = "0";

/// TTLs (seconds) applied to each family of keys
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheTtls {
    pub page: i64,
    pub snapshot: i64,
    pub user_reaction: i64,
    pub dirty: i64,
}

impl From<&CacheConfig> for CacheTtls {
    fn from(config: &CacheConfig) -> Self {
        Self {
            page: ttl_secs(config.page_ttl_secs),
            snapshot: ttl_secs(config.snapshot_ttl_secs),
            user_reaction: ttl_secs(config.user_reaction_ttl_secs),
            dirty: ttl_secs(config.dirty_ttl_secs),
        }
    }
}

/// Decode one reaction field; a bare flag without a version reads as unversioned
fn parse_flag(value: &str) -> Option<(bool, i64)> {
    let (flag, version) = match value.split_once(':') {
        Some((flag, version)) => (flag, version.parse().ok()?),
        None => (value, UNVERSIONED),
    };
    match flag {
        REACTED => Some((true, version)),
        NOT_REACTED => Some((false, version)),
        _ => None,
    }
}

/// Parse a cached reaction hash; `known` holds the kinds with a valid field
fn parse_reaction_hash(user_id: UserId, fields: &HashMap<String, String>) -> UserReactionState {
    let mut state = UserReactionState {
        user_id,
        known: ReactionSet::empty(),
        reacted: ReactionSet::empty(),
        versions: [UNVERSIONED; 5],
    };
    for kind in ReactionKind::ALL {
        if let Some((reacted, version)) = fields.get(kind.as_str()).and_then(|v| parse_flag(v)) {
            state.known |= kind.flag();
            state.reacted.set(kind.flag(), reacted);
            state.versions[kind.index()] = version;
        }
    }
    state
}

fn flag_value(reacted: bool) -> &'static str {
    if reacted {
        REACTED
    } else {
        NOT_REACTED
    }
}

/// Report page, snapshot, reaction and dirty-set store
#[derive(Clone)]
pub struct RedisReportCache {
    pool: RedisPool,
    page_key: String,
    ttls: CacheTtls,
    patch_script: Script,
    mark_script: Script,
    clear_script: Script,
    flag_script: Script,
    fill_script: Script,
}

impl std::fmt::Debug for RedisReportCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisReportCache")
            .field("page_key", &self.page_key)
            .field("ttls", &self.ttls)
            .finish_non_exhaustive()
    }
}

impl RedisReportCache {
    /// Create a cache bound to the configured partition and TTLs
    pub fn new(pool: RedisPool, config: &CacheConfig) -> Self {
        Self::with_ttls(pool, &config.partition, CacheTtls::from(config))
    }

    pub fn with_ttls(pool: RedisPool, partition: &Partition, ttls: CacheTtls) -> Self {
        Self {
            pool,
            page_key: keys::page(partition),
            ttls,
            patch_script: scripts::patch_if_exists(),
            mark_script: scripts::mark_dirty(),
            clear_script: scripts::clear_dirty(),
            flag_script: scripts::set_flag_if_newer(),
            fill_script: scripts::fill_absent(),
        }
    }

    async fn patch_snapshot(
        &self,
        report_id: ReportId,
        fields: Vec<(&'static str, String)>,
    ) -> CacheResult<bool> {
        let mut conn = self.pool.get().await?;
        let mut invocation = self.patch_script.key(keys::snapshot(report_id));
        for (field, value) in fields {
            invocation.arg(field).arg(value);
        }
        let patched: i32 = invocation
            .invoke_async(&mut conn)
            .await
            .map_err(RedisPoolError::from)?;
        Ok(patched == 1)
    }
}

#[async_trait]
impl ReportCache for RedisReportCache {
    #[instrument(skip(self))]
    async fn get_page(&self) -> CacheResult<Option<Vec<ReportId>>> {
        let mut conn = self.pool.get().await?;
        let ids: Vec<i64> = conn
            .lrange(&self.page_key, 0, -1)
            .await
            .map_err(RedisPoolError::from)?;

        // Redis never stores an empty list, so empty means absent
        if ids.is_empty() {
            return Ok(None);
        }
        Ok(Some(ids.into_iter().map(ReportId::new).collect()))
    }

    #[instrument(skip(self, ids), fields(count = ids.len()))]
    async fn get_snapshots(&self, ids: &[ReportId]) -> CacheResult<Vec<Option<ReportSnapshot>>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut pipe = redis::pipe();
        for id in ids {
            pipe.hgetall(keys::snapshot(*id));
        }
        let mut conn = self.pool.get().await?;
        let rows: Vec<HashMap<String, String>> = pipe
            .query_async(&mut conn)
            .await
            .map_err(RedisPoolError::from)?;

        Ok(ids
            .iter()
            .zip(rows)
            .map(|(id, fields)| {
                if fields.is_empty() {
                    return None;
                }
                match snapshot::from_fields(*id, &fields) {
                    Ok(snapshot) => Some(snapshot),
                    Err(field) => {
                        warn!(report_id = %id, field, "Malformed snapshot entry, treating as miss");
                        None
                    }
                }
            })
            .collect())
    }

    #[instrument(skip(self, items), fields(count = items.len()))]
    async fn set_page(&self, items: &[ReportSnapshot]) -> CacheResult<()> {
        let mut pipe = redis::pipe();
        pipe.atomic().del(&self.page_key).ignore();

        if !items.is_empty() {
            for item in items {
                let key = keys::snapshot(item.id);
                pipe.del(&key)
                    .ignore()
                    .hset_multiple(&key, &snapshot::to_fields(item))
                    .ignore()
                    .expire(&key, self.ttls.snapshot)
                    .ignore();
            }
            let ids: Vec<i64> = items.iter().map(|item| item.id.into_inner()).collect();
            pipe.rpush(&self.page_key, ids)
                .ignore()
                .expire(&self.page_key, self.ttls.page)
                .ignore();
        }

        let mut conn = self.pool.get().await?;
        pipe.query_async::<()>(&mut conn)
            .await
            .map_err(RedisPoolError::from)?;

        debug!(page_key = %self.page_key, count = items.len(), "Report page cached");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn invalidate_page(&self) -> CacheResult<()> {
        let mut conn = self.pool.get().await?;
        let ids: Vec<i64> = conn
            .lrange(&self.page_key, 0, -1)
            .await
            .map_err(RedisPoolError::from)?;

        let mut doomed: Vec<String> = ids
            .into_iter()
            .map(|id| keys::snapshot(ReportId::new(id)))
            .collect();
        doomed.push(self.page_key.clone());

        conn.del::<_, ()>(doomed)
            .await
            .map_err(RedisPoolError::from)?;

        debug!(page_key = %self.page_key, "Report page invalidated");
        Ok(())
    }

    async fn update_snapshot_count(
        &self,
        report_id: ReportId,
        kind: ReactionKind,
        count: i64,
    ) -> CacheResult<bool> {
        self.patch_snapshot(
            report_id,
            vec![(snapshot::count_field(kind), count.max(0).to_string())],
        )
        .await
    }

    async fn set_snapshot_counts(
        &self,
        report_id: ReportId,
        counts: &ReactionCounts,
    ) -> CacheResult<bool> {
        self.patch_snapshot(report_id, snapshot::count_fields(counts))
            .await
    }

    async fn get_user_reaction(
        &self,
        report_id: ReportId,
        user_id: UserId,
        kind: ReactionKind,
    ) -> CacheResult<CachedReaction> {
        let mut conn = self.pool.get().await?;
        let value: Option<String> = conn
            .hget(keys::user_reaction(report_id, user_id), kind.as_str())
            .await
            .map_err(RedisPoolError::from)?;

        Ok(match value.as_deref().and_then(parse_flag) {
            Some((reacted, _)) => CachedReaction::from_flag(reacted),
            None => CachedReaction::Unknown,
        })
    }

    #[instrument(skip(self, report_ids), fields(reports = report_ids.len()))]
    async fn get_user_reactions_many(
        &self,
        report_ids: &[ReportId],
        user_id: UserId,
    ) -> CacheResult<Vec<Option<ReactionSet>>> {
        if report_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut pipe = redis::pipe();
        for id in report_ids {
            pipe.hgetall(keys::user_reaction(*id, user_id));
        }
        let mut conn = self.pool.get().await?;
        let rows: Vec<HashMap<String, String>> = pipe
            .query_async(&mut conn)
            .await
            .map_err(RedisPoolError::from)?;

        Ok(rows
            .iter()
            .map(|fields| {
                let state = parse_reaction_hash(user_id, fields);
                state.known.is_all().then_some(state.reacted)
            })
            .collect())
    }

    #[instrument(skip(self))]
    async fn set_user_reaction(
        &self,
        report_id: ReportId,
        user_id: UserId,
        kind: ReactionKind,
        reacted: bool,
        version: i64,
    ) -> CacheResult<bool> {
        let mut conn = self.pool.get().await?;
        let written: i32 = self
            .flag_script
            .key(keys::user_reaction(report_id, user_id))
            .key(keys::reaction_users(report_id))
            .arg(kind.as_str())
            .arg(flag_value(reacted))
            .arg(version)
            .arg(user_id.into_inner())
            .arg(self.ttls.user_reaction)
            .invoke_async(&mut conn)
            .await
            .map_err(RedisPoolError::from)?;

        if written == 0 {
            debug!(%report_id, %user_id, kind = kind.as_str(), version, "Newer cached reaction kept");
        }
        Ok(written == 1)
    }

    async fn set_user_reactions_if_absent(
        &self,
        report_id: ReportId,
        user_id: UserId,
        reactions: ReactionSet,
    ) -> CacheResult<()> {
        let mut invocation = self.fill_script.key(keys::user_reaction(report_id, user_id));
        invocation.arg(self.ttls.user_reaction);
        for kind in ReactionKind::ALL {
            invocation
                .arg(kind.as_str())
                .arg(format!("{}:{}", flag_value(reactions.has(kind)), UNVERSIONED));
        }

        let mut conn = self.pool.get().await?;
        invocation
            .invoke_async::<i32>(&mut conn)
            .await
            .map_err(RedisPoolError::from)?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn evict_user_reactions(&self, report_id: ReportId, user_id: UserId) -> CacheResult<()> {
        let mut pipe = redis::pipe();
        pipe.atomic()
            .del(keys::user_reaction(report_id, user_id))
            .ignore()
            .srem(keys::reaction_users(report_id), user_id.into_inner())
            .ignore();

        let mut conn = self.pool.get().await?;
        pipe.query_async::<()>(&mut conn)
            .await
            .map_err(RedisPoolError::from)?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn cached_reaction_states(
        &self,
        report_id: ReportId,
    ) -> CacheResult<Vec<UserReactionState>> {
        let mut conn = self.pool.get().await?;
        let users: Vec<i64> = conn
            .smembers(keys::reaction_users(report_id))
            .await
            .map_err(RedisPoolError::from)?;
        if users.is_empty() {
            return Ok(Vec::new());
        }

        let mut pipe = redis::pipe();
        for user in &users {
            pipe.hgetall(keys::user_reaction(report_id, UserId::new(*user)));
        }
        let rows: Vec<HashMap<String, String>> = pipe
            .query_async(&mut conn)
            .await
            .map_err(RedisPoolError::from)?;

        Ok(users
            .into_iter()
            .zip(rows)
            .map(|(user, fields)| parse_reaction_hash(UserId::new(user), &fields))
            // Expired hashes leave nothing to reconcile
            .filter(|state| !state.known.is_empty())
            .collect())
    }

    #[instrument(skip(self))]
    async fn mark_dirty(&self, report_id: ReportId) -> CacheResult<()> {
        let mut conn = self.pool.get().await?;
        self.mark_script
            .key(keys::DIRTY_KEY)
            .arg(report_id.into_inner())
            .arg(Utc::now().timestamp_millis())
            .arg(self.ttls.dirty)
            .invoke_async::<i64>(&mut conn)
            .await
            .map_err(RedisPoolError::from)?;
        Ok(())
    }

    async fn drain_dirty(&self) -> CacheResult<Vec<DirtyMarker>> {
        let mut conn = self.pool.get().await?;
        let members: Vec<(i64, f64)> = conn
            .zrange_withscores(keys::DIRTY_KEY, 0, -1)
            .await
            .map_err(RedisPoolError::from)?;

        Ok(members
            .into_iter()
            .map(|(id, score)| DirtyMarker {
                report_id: ReportId::new(id),
                marked_at: score as i64,
            })
            .collect())
    }

    async fn clear_dirty(&self, marker: &DirtyMarker) -> CacheResult<bool> {
        let mut conn = self.pool.get().await?;
        let removed: i32 = self
            .clear_script
            .key(keys::DIRTY_KEY)
            .arg(marker.report_id.into_inner())
            .arg(marker.marked_at)
            .invoke_async(&mut conn)
            .await
            .map_err(RedisPoolError::from)?;
        Ok(removed == 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hash(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_parse_reaction_hash() {
        let user = UserId::new(7);
        let state = parse_reaction_hash(user, &hash(&[("HEART", "1:12"), ("EYES", "0:0")]));
        assert_eq!(state.known, ReactionSet::HEART | ReactionSet::EYES);
        assert_eq!(state.reacted, ReactionSet::HEART);
        assert_eq!(state.version(ReactionKind::Heart), 12);
        assert_eq!(state.version(ReactionKind::Eyes), UNVERSIONED);

        let state = parse_reaction_hash(user, &hash(&[("HEART", "yes"), ("EYES", "1:x")]));
        assert!(state.known.is_empty());
    }

    #[test]
    fn test_bare_flag_is_unversioned() {
        assert_eq!(parse_flag("1"), Some((true, UNVERSIONED)));
        assert_eq!(parse_flag("0:9"), Some((false, 9)));
        assert_eq!(parse_flag("2:9"), None);
    }

    #[test]
    fn test_ttls_from_config() {
        let ttls = CacheTtls::from(&CacheConfig::default());
        assert_eq!(ttls.page, 3600);
        assert_eq!(ttls.user_reaction, 1800);
        assert_eq!(ttls.dirty, 86_400);
    }
}
