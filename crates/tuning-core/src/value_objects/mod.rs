//! Value objects - immutable types that represent domain concepts

mod ids;
mod partition;
mod reaction_set;

pub use ids::{IdParseError, ReportId, UserId};
pub use partition::{Partition, PartitionError, DEFAULT_PARTITION};
pub use reaction_set::ReactionSet;
