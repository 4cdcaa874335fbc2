//! Repository implementations
//!
//! PostgreSQL implementations of the repository traits defined in tuning-core.

mod error;
mod report;

pub use report::PgReportRepository;
