//! Port traits - interfaces the domain needs from infrastructure

mod alarm;
mod cache;
mod lock;
mod repositories;

pub use alarm::AlarmSink;
pub use cache::{
    CacheResult, CachedReaction, DirtyMarker, ReportCache, UserReactionState, UNVERSIONED,
};
pub use lock::{LeaderLock, LockToken};
pub use repositories::{
    RepoResult, ReportQuery, ReportRepository, ReportSort, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE,
};
