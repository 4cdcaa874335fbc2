//! Request-path services
//!
//! Each service borrows the shared [`ServiceContext`] for the duration of a call.

pub mod context;
pub mod error;
pub mod reaction;
pub mod report_query;
pub mod retry;

pub use context::{ServiceContext, ServiceContextBuilder};
pub use error::{ServiceError, ServiceResult};
pub use reaction::ReactionMutator;
pub use report_query::ReportQueryRouter;
pub use retry::RetryPolicy;
