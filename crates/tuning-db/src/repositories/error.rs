//! Error handling utilities for repositories

use sqlx::Error as SqlxError;
use tuning_core::{DomainError, ReportId};

/// serialization_failure
const SERIALIZATION_FAILURE: &str = "40001";
/// deadlock_detected
const DEADLOCK_DETECTED: &str = "40P01";
/// lock_not_available (lock_timeout elapsed)
const LOCK_NOT_AVAILABLE: &str = "55P03";

/// Convert SQLx error to DomainError
///
/// Conflict, deadlock-victim and lock-timeout failures become
/// `LockContention` so the caller's retry policy can pick them up.
pub fn map_db_error(e: SqlxError) -> DomainError {
    if let Some(db_err) = e.as_database_error() {
        if let Some(code) = db_err.code() {
            if matches!(
                code.as_ref(),
                SERIALIZATION_FAILURE | DEADLOCK_DETECTED | LOCK_NOT_AVAILABLE
            ) {
                return DomainError::LockContention(db_err.message().to_string());
            }
        }
    }
    DomainError::DatabaseError(e.to_string())
}

/// Check for unique violation and return appropriate error or fallback
pub fn map_unique_violation<F>(e: SqlxError, on_unique: F) -> DomainError
where
    F: FnOnce() -> DomainError,
{
    if let Some(db_err) = e.as_database_error() {
        if db_err.is_unique_violation() {
            return on_unique();
        }
    }
    map_db_error(e)
}

/// Create a "report not found" error
pub fn report_not_found(id: ReportId) -> DomainError {
    DomainError::ReportNotFound(id)
}
