//! Report listing and reaction cache

mod report_cache;
pub(crate) mod scripts;
mod snapshot;

pub use report_cache::{CacheTtls, RedisReportCache};
