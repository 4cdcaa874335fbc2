//! Redis key layout for the report cache

use tuning_core::{Partition, ReportId, UserId};

/// Key prefix for the canonical page id list
const PAGE_PREFIX: &str = "report_page:";
/// Key prefix for per-report snapshots
const SNAPSHOT_PREFIX: &str = "report_snapshot:";
/// Key prefix for per-(report, user) reaction flags
const REACTION_PREFIX: &str = "report_reaction:";
/// Key prefix for the set of users with cached flags on a report
const REACTION_USERS_PREFIX: &str = "report_reaction_users:";

/// Sorted set of reports awaiting reconciliation
pub const DIRTY_KEY: &str = "report_dirty";

pub fn page(partition: &Partition) -> String {
    format!("{PAGE_PREFIX}{partition}")
}

pub fn snapshot(report_id: ReportId) -> String {
    format!("{SNAPSHOT_PREFIX}{report_id}")
}

pub fn user_reaction(report_id: ReportId, user_id: UserId) -> String {
    format!("{REACTION_PREFIX}{report_id}:{user_id}")
}

pub fn reaction_users(report_id: ReportId) -> String {
    format!("{REACTION_USERS_PREFIX}{report_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_layout() {
        let partition = Partition::new("example.com").unwrap();
        assert_eq!(page(&partition), "report_page:example.com");
        assert_eq!(snapshot(ReportId::new(42)), "report_snapshot:42");
        assert_eq!(
            user_reaction(ReportId::new(42), UserId::new(7)),
            "report_reaction:42:7"
        );
        assert_eq!(reaction_users(ReportId::new(42)), "report_reaction_users:42");
    }
}
