pub mod kind;
pub mod repository;

use std::collections::BTreeMap;

use serde::Serialize;

pub use kind::{ReactionKind, UnknownKind};
pub use repository::{
    ReactionRepository, RepositoryError, SqliteReactionRepository, ToggleAction, ToggleOutcome,
};

/// Every kind with its count, plus what the caller applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactionSummary {
    pub summary: BTreeMap<ReactionKind, i64>,
    pub user_reacted: Vec<ReactionKind>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct KindCount {
    #[serde(rename = "type")]
    pub kind: ReactionKind,
    pub count: i64,
}

/// Fill in every enumerated kind, defaulting to zero.
pub fn summarize(counts: &[(ReactionKind, i64)], user_reacted: Vec<ReactionKind>) -> ReactionSummary {
    let mut summary: BTreeMap<ReactionKind, i64> =
        ReactionKind::ALL.into_iter().map(|kind| (kind, 0)).collect();
    for (kind, count) in counts {
        summary.insert(*kind, *count);
    }
    ReactionSummary {
        summary,
        user_reacted,
    }
}

/// Only the kinds actually present on the post.
pub fn present_counts(counts: &[(ReactionKind, i64)]) -> Vec<KindCount> {
    counts
        .iter()
        .filter(|(_, count)| *count > 0)
        .map(|(kind, count)| KindCount {
            kind: *kind,
            count: *count,
        })
        .collect()
}
