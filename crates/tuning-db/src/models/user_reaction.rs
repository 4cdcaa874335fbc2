//! User reaction database models

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database model for the user_reactions table
#[derive(Debug, Clone, FromRow)]
pub struct UserReactionModel {
    pub report_id: i64,
    pub user_id: i64,
    pub kind: String,
    pub created_at: DateTime<Utc>,
}

/// (report, kind) pair for a single user's batched lookup
#[derive(Debug, Clone, FromRow)]
pub struct UserReactionKindModel {
    pub report_id: i64,
    pub kind: String,
}
