//! Model to entity mappers
//!
//! - `From<Model> for Entity`: convert database rows to domain objects
//! - `reaction_set_from_kinds`: fold stored kind strings into a `ReactionSet`

mod report;
mod user_reaction;

pub use report::reaction_set_from_kinds;
pub use user_reaction::UserReactionBatch;
