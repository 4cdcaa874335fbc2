//! Axum extractors for request handling

mod caller;
mod path;
mod query;

pub use caller::Caller;
pub use path::ReactionPath;
pub use query::PageQuery;
