//! Report entity - a generated tuning report users react to

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ReactionCounts;
use crate::value_objects::ReportId;

/// Report entity as stored in the database
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub id: ReportId,
    pub title: String,
    pub content: String,
    pub counts: ReactionCounts,
    pub created_at: DateTime<Utc>,
    /// Flipped by the visibility job once the report may be shown
    pub visible: bool,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Report {
    /// Whether the report may appear in listings and accept reactions
    #[inline]
    pub fn is_listed(&self) -> bool {
        self.visible && self.deleted_at.is_none()
    }

    /// Read view stored in the snapshot cache
    pub fn snapshot(&self) -> ReportSnapshot {
        ReportSnapshot {
            id: self.id,
            title: self.title.clone(),
            content: self.content.clone(),
            counts: self.counts,
            created_at: self.created_at,
        }
    }
}

/// Serialized per-report read view kept in the cache
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSnapshot {
    pub id: ReportId,
    pub title: String,
    pub content: String,
    pub counts: ReactionCounts,
    pub created_at: DateTime<Utc>,
}

impl From<Report> for ReportSnapshot {
    fn from(report: Report) -> Self {
        Self {
            id: report.id,
            title: report.title,
            content: report.content,
            counts: report.counts,
            created_at: report.created_at,
        }
    }
}
