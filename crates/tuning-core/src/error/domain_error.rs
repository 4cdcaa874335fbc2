//! Domain errors - error types for the domain layer

use thiserror::Error;

use crate::value_objects::ReportId;

/// Domain layer errors
#[derive(Debug, Error)]
pub enum DomainError {
    // =========================================================================
    // Not Found Errors
    // =========================================================================
    #[error("Report not found: {0}")]
    ReportNotFound(ReportId),

    // =========================================================================
    // Validation Errors
    // =========================================================================
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Unknown reaction kind: {0}")]
    InvalidReactionKind(String),

    // =========================================================================
    // Contention Errors
    // =========================================================================
    /// Serialization failure, deadlock victim, or lock wait timeout.
    #[error("Lock contention: {0}")]
    LockContention(String),

    // =========================================================================
    // Infrastructure Errors (wrapped)
    // =========================================================================
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Cache error: {0}")]
    CacheError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl DomainError {
    /// Get an error code string for API responses
    pub fn code(&self) -> &'static str {
        match self {
            Self::ReportNotFound(_) => "UNKNOWN_REPORT",
            Self::ValidationError(_) => "VALIDATION_ERROR",
            Self::InvalidReactionKind(_) => "INVALID_REACTION_KIND",
            Self::LockContention(_) => "LOCK_CONTENTION",
            Self::DatabaseError(_) => "DATABASE_ERROR",
            Self::CacheError(_) => "CACHE_ERROR",
            Self::InternalError(_) => "INTERNAL_ERROR",
        }
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ReportNotFound(_))
    }

    /// Check if this is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::ValidationError(_) | Self::InvalidReactionKind(_))
    }

    /// Check if the failed operation may succeed when retried
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::LockContention(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(DomainError::ReportNotFound(ReportId::new(1)).code(), "UNKNOWN_REPORT");
        assert_eq!(DomainError::LockContention("x".into()).code(), "LOCK_CONTENTION");
    }

    #[test]
    fn test_classification() {
        assert!(DomainError::ReportNotFound(ReportId::new(1)).is_not_found());
        assert!(DomainError::LockContention("deadlock".into()).is_retryable());
        assert!(!DomainError::DatabaseError("boom".into()).is_retryable());
        assert!(DomainError::InvalidReactionKind("clap".into()).is_validation());
    }

    #[test]
    fn test_error_display() {
        let err = DomainError::ReportNotFound(ReportId::new(42));
        assert_eq!(err.to_string(), "Report not found: 42");
    }
}
