//! Reconciliation state -> array binds

use tuning_core::{CachedReaction, ReactionKind, UserReactionState};

/// Parallel arrays for `UNNEST`-based bulk insert/delete of reaction rows
#[derive(Debug, Default, PartialEq, Eq)]
pub struct UserReactionBatch {
    pub insert_users: Vec<i64>,
    pub insert_kinds: Vec<String>,
    pub delete_users: Vec<i64>,
    pub delete_kinds: Vec<String>,
}

impl UserReactionBatch {
    /// Split cached states into rows to ensure present and rows to ensure absent.
    /// Kinds the cache does not know about, and flags superseded by a later
    /// toggle than `report_version`, are left untouched.
    pub fn from_states(states: &[UserReactionState], report_version: i64) -> Self {
        let mut batch = Self::default();
        for state in states {
            let user = state.user_id.into_inner();
            for kind in ReactionKind::ALL {
                match state.current_as_of(kind, report_version) {
                    CachedReaction::Reacted => {
                        batch.insert_users.push(user);
                        batch.insert_kinds.push(kind.as_str().to_string());
                    }
                    CachedReaction::NotReacted => {
                        batch.delete_users.push(user);
                        batch.delete_kinds.push(kind.as_str().to_string());
                    }
                    CachedReaction::Unknown => {}
                }
            }
        }
        batch
    }

    pub fn is_empty(&self) -> bool {
        self.insert_users.is_empty() && self.delete_users.is_empty()
    }
}
