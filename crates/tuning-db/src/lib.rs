//! # tuning-db
//!
//! PostgreSQL implementation of the report repository port via SQLx.
//!
//! ## Overview
//!
//! - Connection pool management and schema migrations
//! - Database models with SQLx `FromRow` derives
//! - Model → entity mappers
//! - `PgReportRepository`: listing reads, the row-locked reaction toggle,
//!   and the reconciliation transaction used by the flush job
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tuning_db::{create_pool, run_migrations, PgReportRepository};
//!
//! async fn example(config: &tuning_common::DatabaseConfig) -> Result<(), Box<dyn std::error::Error>> {
//!     let pool = create_pool(config).await?;
//!     run_migrations(&pool).await?;
//!     let reports = PgReportRepository::new(pool);
//!     Ok(())
//! }
//! ```

pub mod mappers;
pub mod models;
pub mod pool;
pub mod repositories;

// Re-export commonly used types
pub use pool::{create_pool, run_migrations, PgPool};
pub use repositories::PgReportRepository;
