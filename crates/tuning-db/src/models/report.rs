//! Report database models

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database model for the reports table
#[derive(Debug, Clone, FromRow)]
pub struct ReportModel {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub celebrate_count: i64,
    pub thumbs_up_count: i64,
    pub laugh_count: i64,
    pub eyes_count: i64,
    pub heart_count: i64,
    pub created_at: DateTime<Utc>,
    pub visible: bool,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Report row joined with the caller's reaction kinds (from query)
#[derive(Debug, Clone, FromRow)]
pub struct ReportWithReactionsModel {
    #[sqlx(flatten)]
    pub report: ReportModel,
    pub my_reactions: Vec<String>,
}

/// The five counter columns, as returned by `RETURNING`
#[derive(Debug, Clone, Copy, FromRow)]
pub struct ReactionCountsModel {
    pub celebrate_count: i64,
    pub thumbs_up_count: i64,
    pub laugh_count: i64,
    pub eyes_count: i64,
    pub heart_count: i64,
}
