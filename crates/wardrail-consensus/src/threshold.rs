use chrono::{DateTime, Duration, Utc};
use std::collections::HashSet;
use wardrail_core::ApprovalArtifact;

use crate::approver::ApproverSet;
use crate::used::UsedArtifacts;

/// Selects the artifacts that count toward the threshold: for a
/// required circle, not expired, not a duplicate circle, and not
/// already consumed by an earlier committed attempt. Mirrors a
/// validator set's "reject duplicate confirmations" rule, generalized
/// from a stake-weighted vote to a one-circle-one-vote count against a
/// fixed configured threshold.
pub fn valid_artifacts(
    artifacts: &[ApprovalArtifact],
    approvers: &ApproverSet,
    expiry: Duration,
    now: DateTime<Utc>,
    used: &UsedArtifacts,
) -> Vec<ApprovalArtifact> {
    let mut seen = HashSet::new();
    let mut valid = Vec::new();
    for artifact in artifacts {
        if !approvers.is_required(&artifact.circle_id) {
            continue;
        }
        if now - artifact.presented_at > expiry {
            continue;
        }
        if used.is_used(artifact) {
            continue;
        }
        if !seen.insert(artifact.circle_id.clone()) {
            continue;
        }
        valid.push(artifact.clone());
    }
    valid
}

pub fn meets_threshold(count: u32, approvers: &ApproverSet) -> bool {
    count >= approvers.threshold()
}
