//! Reaction kinds, per-report counters, and the per-user reaction relation

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::DomainError;
use crate::value_objects::{ReactionSet, ReportId, UserId};

/// The closed set of reactions a user can attach to a report.
///
/// Adding a variant requires a schema migration (new counter column) and a
/// cache key migration (new hash field), so the set is deliberately fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReactionKind {
    Celebrate,
    ThumbsUp,
    Laugh,
    Eyes,
    Heart,
}

impl ReactionKind {
    /// All kinds in storage order
    pub const ALL: [ReactionKind; 5] = [
        Self::Celebrate,
        Self::ThumbsUp,
        Self::Laugh,
        Self::Eyes,
        Self::Heart,
    ];

    /// Wire / cache field name
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Celebrate => "CELEBRATE",
            Self::ThumbsUp => "THUMBS_UP",
            Self::Laugh => "LAUGH",
            Self::Eyes => "EYES",
            Self::Heart => "HEART",
        }
    }

    /// Counter column on the `reports` table
    pub const fn column(self) -> &'static str {
        match self {
            Self::Celebrate => "celebrate_count",
            Self::ThumbsUp => "thumbs_up_count",
            Self::Laugh => "laugh_count",
            Self::Eyes => "eyes_count",
            Self::Heart => "heart_count",
        }
    }

    /// Bit in a [`ReactionSet`]
    pub const fn flag(self) -> ReactionSet {
        match self {
            Self::Celebrate => ReactionSet::CELEBRATE,
            Self::ThumbsUp => ReactionSet::THUMBS_UP,
            Self::Laugh => ReactionSet::LAUGH,
            Self::Eyes => ReactionSet::EYES,
            Self::Heart => ReactionSet::HEART,
        }
    }

    /// Position in [`ReactionKind::ALL`]
    pub const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for ReactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ReactionKind {
    type Err = DomainError;

    /// Accepts `HEART`, `heart`, `thumbs-up`, `thumbs_up`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| DomainError::InvalidReactionKind(s.to_string()))
    }
}

/// The five independent reaction counters of a report.
///
/// Counters are never negative: decrements saturate at zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionCounts {
    pub celebrate: i64,
    pub thumbs_up: i64,
    pub laugh: i64,
    pub eyes: i64,
    pub heart: i64,
}

impl ReactionCounts {
    pub fn get(&self, kind: ReactionKind) -> i64 {
        match kind {
            ReactionKind::Celebrate => self.celebrate,
            ReactionKind::ThumbsUp => self.thumbs_up,
            ReactionKind::Laugh => self.laugh,
            ReactionKind::Eyes => self.eyes,
            ReactionKind::Heart => self.heart,
        }
    }

    /// Set a counter, clamping negative input to zero
    pub fn set(&mut self, kind: ReactionKind, value: i64) {
        let value = value.max(0);
        match kind {
            ReactionKind::Celebrate => self.celebrate = value,
            ReactionKind::ThumbsUp => self.thumbs_up = value,
            ReactionKind::Laugh => self.laugh = value,
            ReactionKind::Eyes => self.eyes = value,
            ReactionKind::Heart => self.heart = value,
        }
    }

    pub fn increment(&mut self, kind: ReactionKind) -> i64 {
        let next = self.get(kind).saturating_add(1);
        self.set(kind, next);
        next
    }

    pub fn decrement(&mut self, kind: ReactionKind) -> i64 {
        let next = (self.get(kind) - 1).max(0);
        self.set(kind, next);
        next
    }

    pub fn total(&self) -> i64 {
        ReactionKind::ALL.iter().map(|k| self.get(*k)).sum()
    }
}

/// Existence of this row is the only record that a user reacted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserReaction {
    pub report_id: ReportId,
    pub user_id: UserId,
    pub kind: ReactionKind,
    pub created_at: DateTime<Utc>,
}

impl UserReaction {
    pub fn new(report_id: ReportId, user_id: UserId, kind: ReactionKind) -> Self {
        Self {
            report_id,
            user_id,
            kind,
            created_at: Utc::now(),
        }
    }
}

/// Result of one committed toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToggleOutcome {
    pub report_id: ReportId,
    pub kind: ReactionKind,
    /// Reacted state after the toggle
    pub reacted: bool,
    /// Counter value after the toggle
    pub count: i64,
    /// Reaction version of the report after this toggle; rises with every
    /// committed toggle on the report
    pub version: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_parse() {
        assert_eq!("HEART".parse::<ReactionKind>().unwrap(), ReactionKind::Heart);
        assert_eq!("thumbs-up".parse::<ReactionKind>().unwrap(), ReactionKind::ThumbsUp);
        assert_eq!("Thumbs_Up".parse::<ReactionKind>().unwrap(), ReactionKind::ThumbsUp);
        assert!("clap".parse::<ReactionKind>().is_err());
    }

    #[test]
    fn test_kind_serde() {
        assert_eq!(serde_json::to_string(&ReactionKind::ThumbsUp).unwrap(), "\"THUMBS_UP\"");
        let kind: ReactionKind = serde_json::from_str("\"EYES\"").unwrap();
        assert_eq!(kind, ReactionKind::Eyes);
    }

    #[test]
    fn test_columns_are_distinct() {
        let mut columns: Vec<_> = ReactionKind::ALL.iter().map(|k| k.column()).collect();
        columns.dedup();
        assert_eq!(columns.len(), 5);
    }

    #[test]
    fn test_index_matches_storage_order() {
        for (i, kind) in ReactionKind::ALL.iter().enumerate() {
            assert_eq!(kind.index(), i);
        }
    }

    #[test]
    fn test_decrement_saturates_at_zero() {
        let mut counts = ReactionCounts::default();
        assert_eq!(counts.decrement(ReactionKind::Laugh), 0);
        assert_eq!(counts.increment(ReactionKind::Laugh), 1);
        assert_eq!(counts.decrement(ReactionKind::Laugh), 0);
        assert_eq!(counts.decrement(ReactionKind::Laugh), 0);
    }

    #[test]
    fn test_set_clamps_negative() {
        let mut counts = ReactionCounts::default();
        counts.set(ReactionKind::Heart, -4);
        assert_eq!(counts.heart, 0);
        counts.set(ReactionKind::Eyes, 3);
        counts.set(ReactionKind::Celebrate, 2);
        assert_eq!(counts.total(), 5);
    }
}
