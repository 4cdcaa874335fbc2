//! Domain entities - core business objects

mod reaction;
mod report;

pub use reaction::{ReactionCounts, ReactionKind, ToggleOutcome, UserReaction};
pub use report::{Report, ReportSnapshot};
