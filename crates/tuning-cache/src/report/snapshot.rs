//! Snapshot <-> Redis hash fields
//!
//! Snapshots are stored as hashes so a single counter can be overwritten
//! in place without rewriting (or re-serializing) the whole entry.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tuning_core::{ReactionCounts, ReactionKind, ReportId, ReportSnapshot};

const TITLE: &str = "title";
const CONTENT: &str = "content";
const CREATED_AT: &str = "created_at";

/// Hash field holding the counter for `kind`
pub fn count_field(kind: ReactionKind) -> &'static str {
    kind.as_str()
}

/// Field/value pairs for `HSET`
pub fn to_fields(snapshot: &ReportSnapshot) -> Vec<(&'static str, String)> {
    let mut fields = vec![
        (TITLE, snapshot.title.clone()),
        (CONTENT, snapshot.content.clone()),
        (CREATED_AT, snapshot.created_at.to_rfc3339()),
    ];
    fields.extend(count_fields(&snapshot.counts));
    fields
}

pub fn count_fields(counts: &ReactionCounts) -> Vec<(&'static str, String)> {
    ReactionKind::ALL
        .iter()
        .map(|kind| (count_field(*kind), counts.get(*kind).to_string()))
        .collect()
}

/// Rebuild a snapshot from `HGETALL`; `Err` names the first bad field
pub fn from_fields(
    id: ReportId,
    fields: &HashMap<String, String>,
) -> Result<ReportSnapshot, &'static str> {
    let text = |name: &'static str| fields.get(name).cloned().ok_or(name);

    let created_at = DateTime::parse_from_rfc3339(&text(CREATED_AT)?)
        .map_err(|_| CREATED_AT)?
        .with_timezone(&Utc);

    let mut counts = ReactionCounts::default();
    for kind in ReactionKind::ALL {
        let name = count_field(kind);
        let value: i64 = text(name)?.parse().map_err(|_| name)?;
        counts.set(kind, value);
    }

    Ok(ReportSnapshot {
        id,
        title: text(TITLE)?,
        content: text(CONTENT)?,
        counts,
        created_at,
    })
}
