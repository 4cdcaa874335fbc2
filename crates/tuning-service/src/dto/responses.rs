//! Response DTOs for API endpoints

use chrono::{DateTime, Utc};
use serde::Serialize;

use tuning_core::{ReactionKind, ReportQuery};

/// Generic API response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

// ============================================================================
// Report Responses
// ============================================================================

/// Five reaction counters of a report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReactionCountsResponse {
    pub celebrate: i64,
    pub thumbs_up: i64,
    pub laugh: i64,
    pub eyes: i64,
    pub heart: i64,
}

/// The caller's own reactions on a report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MyReactionsResponse {
    pub celebrate: bool,
    pub thumbs_up: bool,
    pub laugh: bool,
    pub eyes: bool,
    pub heart: bool,
}

/// One report as listed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportResponse {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub reactions: ReactionCountsResponse,
    pub my_reactions: MyReactionsResponse,
    pub created_at: DateTime<Utc>,
}

/// Offset pagination metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageMeta {
    pub page: u32,
    pub size: u32,
    /// A full page came back, so another may follow
    pub has_next: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportPageResponse {
    pub items: Vec<ReportResponse>,
    pub pagination: PageMeta,
}

impl ReportPageResponse {
    pub fn new(items: Vec<ReportResponse>, query: &ReportQuery) -> Self {
        let has_next = u32::try_from(items.len()).is_ok_and(|n| n >= query.size);
        Self {
            items,
            pagination: PageMeta {
                page: query.page,
                size: query.size,
                has_next,
            },
        }
    }
}

/// Result of a reaction toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ToggleReactionResponse {
    pub report_id: i64,
    pub kind: ReactionKind,
    pub reacted: bool,
    pub updated_count: i64,
}

// ============================================================================
// Health Responses
// ============================================================================

/// Basic health check response
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
}

impl HealthResponse {
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: Utc::now(),
        }
    }
}

/// Readiness check response
#[derive(Debug, Clone, Serialize)]
pub struct ReadinessResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub checks: HealthChecks,
}

/// Health check status for each backing service
#[derive(Debug, Clone, Serialize)]
pub struct HealthChecks {
    pub database: String,
    pub redis: String,
}

impl ReadinessResponse {
    pub fn ready(database_healthy: bool, redis_healthy: bool) -> Self {
        let label = |ok: bool| if ok { "healthy" } else { "unhealthy" }.to_string();
        Self {
            status: if database_healthy && redis_healthy {
                "ready"
            } else {
                "not_ready"
            }
            .to_string(),
            timestamp: Utc::now(),
            checks: HealthChecks {
                database: label(database_healthy),
                redis: label(redis_healthy),
            },
        }
    }

    pub fn is_ready(&self) -> bool {
        self.status == "ready"
    }
}
