//! Domain -> response DTO conversions

use tuning_core::{ReactionCounts, ReactionKind, ReactionSet, ReportSnapshot, ToggleOutcome};

use super::responses::{
    MyReactionsResponse, ReactionCountsResponse, ReportResponse, ToggleReactionResponse,
};

impl From<ReactionCounts> for ReactionCountsResponse {
    fn from(counts: ReactionCounts) -> Self {
        Self {
            celebrate: counts.celebrate,
            thumbs_up: counts.thumbs_up,
            laugh: counts.laugh,
            eyes: counts.eyes,
            heart: counts.heart,
        }
    }
}

impl From<ReactionSet> for MyReactionsResponse {
    fn from(set: ReactionSet) -> Self {
        Self {
            celebrate: set.has(ReactionKind::Celebrate),
            thumbs_up: set.has(ReactionKind::ThumbsUp),
            laugh: set.has(ReactionKind::Laugh),
            eyes: set.has(ReactionKind::Eyes),
            heart: set.has(ReactionKind::Heart),
        }
    }
}

impl ReportResponse {
    pub fn from_snapshot(snapshot: ReportSnapshot, mine: ReactionSet) -> Self {
        Self {
            id: snapshot.id.into_inner(),
            title: snapshot.title,
            content: snapshot.content,
            reactions: snapshot.counts.into(),
            my_reactions: mine.into(),
            created_at: snapshot.created_at,
        }
    }
}

impl From<ToggleOutcome> for ToggleReactionResponse {
    fn from(outcome: ToggleOutcome) -> Self {
        Self {
            report_id: outcome.report_id.into_inner(),
            kind: outcome.kind,
            reacted: outcome.reacted,
            updated_count: outcome.count,
        }
    }
}
