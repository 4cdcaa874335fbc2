//! Report entity <-> model mapper

use tracing::warn;

use tuning_core::{ReactionCounts, ReactionKind, ReactionSet, Report, ReportId};

use crate::models::{ReactionCountsModel, ReportModel, ReportWithReactionsModel};

impl From<ReactionCountsModel> for ReactionCounts {
    fn from(model: ReactionCountsModel) -> Self {
        ReactionCounts {
            celebrate: model.celebrate_count,
            thumbs_up: model.thumbs_up_count,
            laugh: model.laugh_count,
            eyes: model.eyes_count,
            heart: model.heart_count,
        }
    }
}

/// Convert ReportModel to Report entity
impl From<ReportModel> for Report {
    fn from(model: ReportModel) -> Self {
        Report {
            id: ReportId::new(model.id),
            title: model.title,
            content: model.content,
            counts: ReactionCounts {
                celebrate: model.celebrate_count,
                thumbs_up: model.thumbs_up_count,
                laugh: model.laugh_count,
                eyes: model.eyes_count,
                heart: model.heart_count,
            },
            created_at: model.created_at,
            visible: model.visible,
            deleted_at: model.deleted_at,
        }
    }
}

impl From<ReportWithReactionsModel> for (Report, ReactionSet) {
    fn from(model: ReportWithReactionsModel) -> Self {
        let reactions = reaction_set_from_kinds(&model.my_reactions);
        (Report::from(model.report), reactions)
    }
}

/// Fold stored kind names into a set; unknown names are skipped
pub fn reaction_set_from_kinds<S: AsRef<str>>(kinds: &[S]) -> ReactionSet {
    kinds
        .iter()
        .filter_map(|raw| match raw.as_ref().parse::<ReactionKind>() {
            Ok(kind) => Some(kind),
            Err(_) => {
                warn!(kind = raw.as_ref(), "Ignoring unknown reaction kind in database");
                None
            }
        })
        .collect()
}
