//! # tuning-core
//!
//! Domain layer for tuning reports and their reactions: entities, value
//! objects, errors, and the port traits implemented by the database, cache,
//! and alarm infrastructure.

pub mod entities;
pub mod error;
pub mod traits;
pub mod value_objects;

// Re-export commonly used types at crate root
pub use entities::{ReactionCounts, ReactionKind, Report, ReportSnapshot, ToggleOutcome, UserReaction};
pub use error::DomainError;
pub use traits::{
    AlarmSink, CacheResult, CachedReaction, DirtyMarker, LeaderLock, LockToken, RepoResult,
    ReportCache, ReportQuery, ReportRepository, ReportSort, UserReactionState, DEFAULT_PAGE_SIZE,
    MAX_PAGE_SIZE, UNVERSIONED,
};
pub use value_objects::{
    IdParseError, Partition, PartitionError, ReactionSet, ReportId, UserId, DEFAULT_PARTITION,
};
