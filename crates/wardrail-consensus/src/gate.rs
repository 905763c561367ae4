use chrono::{DateTime, Duration, Utc};
use wardrail_core::{ApprovalArtifact, ApprovalBundle, ExecutionEnvelope, WardrailError};

use crate::approver::ApproverSet;
use crate::neutral_language;
use crate::presentation::PresentationLog;
use crate::symmetry::verify_symmetry;
use crate::threshold::{meets_threshold, valid_artifacts};
use crate::used::UsedArtifacts;

pub struct GateResult {
    pub approvals_counted: u32,
    pub threshold: u32,
    /// The artifacts counted toward this pass. The caller marks these
    /// used against `UsedArtifacts` once (and only once) the attempt
    /// they authorize has actually committed to the ledger — a gate
    /// pass alone does not consume them, since a caps block can still
    /// follow without ever starting an attempt.
    pub consumed_artifacts: Vec<ApprovalArtifact>,
}

/// Runs the multi-party gate's fixed verification order:
/// 1. every required circle presented the bundle, unexpired
/// 2. every artifact is symmetric (signed over the bundle's own hash)
/// 3. description passes the neutral-language scan
/// 4. enough distinct, unexpired, not-yet-used artifacts to meet the
///    approver threshold
pub fn check(
    envelope: &ExecutionEnvelope,
    bundle: &ApprovalBundle,
    presentations: &PresentationLog,
    approvers: &ApproverSet,
    used_artifacts: &UsedArtifacts,
    presentation_expiry: Duration,
    now: DateTime<Utc>,
) -> Result<GateResult, WardrailError> {
    let required: Vec<_> = approvers.required_circles().cloned().collect();
    presentations.verify_all_presented(
        &envelope.envelope_id,
        &required,
        &bundle.content_hash,
        presentation_expiry,
        now,
    )?;

    verify_symmetry(bundle)?;

    if let Some(description) = &envelope.action.description {
        let violations = neutral_language::scan(description);
        if let Some(v) = violations.first() {
            return Err(WardrailError::NeutralLanguageViolation(format!(
                "{} marker: {}",
                v.category, v.marker
            )));
        }
    }

    let valid = valid_artifacts(&bundle.artifacts, approvers, presentation_expiry, now, used_artifacts);
    let count = valid.len() as u32;
    if !meets_threshold(count, approvers) {
        return Err(WardrailError::InsufficientApprovals {
            need: approvers.threshold(),
            got: count,
        });
    }

    Ok(GateResult {
        approvals_counted: count,
        threshold: approvers.threshold(),
        consumed_artifacts: valid,
    })
}
