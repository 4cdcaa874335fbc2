//! Database models - SQLx-compatible structs for PostgreSQL tables

mod report;
mod user_reaction;

pub use report::{ReactionCountsModel, ReportModel, ReportWithReactionsModel};
pub use user_reaction::{UserReactionKindModel, UserReactionModel};
