use crate::error::WardrailError;
use crate::types::{
    ActionHash, AmountMinor, AttemptId, BundleContentHash, CircleId, Currency, EnvelopeId,
    IdempotencyKey, IntersectionId, PayeeId, PersonId, PolicyHash, PresentationId, ProviderId,
    SealHash, TraceId, ViewHash,
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// Injected wall-clock abstraction. No component in this crate, or any
/// crate downstream of it, may call `Utc::now()` directly — every
/// timestamp on a record is produced by a `Clock` the caller supplied.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock backed by the system wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that returns a fixed, externally adjustable instant. Exists
/// so executor- and gate-level tests can exercise expiry, staleness,
/// and pause-timing logic deterministically instead of sleeping on the
/// real wall clock.
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { now: Mutex::new(now) }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().expect("fixed clock mutex poisoned") = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut guard = self.now.lock().expect("fixed clock mutex poisoned");
        *guard += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().expect("fixed clock mutex poisoned")
    }
}

/// What the envelope moves: an amount, in a currency, to a registered
/// payee, through one named action kind.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum ActionKind {
    Payment,
    Refund,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ActionSpec {
    pub amount_minor: AmountMinor,
    pub currency: Currency,
    pub payee_id: PayeeId,
    pub provider_id: ProviderId,
    pub description: Option<String>,
    pub kind: ActionKind,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RevocationRecord {
    pub revoked: bool,
    pub by_circle: Option<CircleId>,
    pub by_person: Option<PersonId>,
    pub at: Option<DateTime<Utc>>,
    pub reason: Option<String>,
}

impl Default for RevocationRecord {
    fn default() -> Self {
        Self {
            revoked: false,
            by_circle: None,
            by_person: None,
            at: None,
            reason: None,
        }
    }
}

/// A sealed, immutable execution envelope. The only field that may change
/// after sealing is `revocation`, and only through
/// `wardrail_revocation`'s apply-to-envelope helper.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExecutionEnvelope {
    pub envelope_id: EnvelopeId,
    pub action: ActionSpec,
    pub action_hash: ActionHash,
    pub seal_hash: SealHash,
    pub circle_id: CircleId,
    pub intersection_id: Option<IntersectionId>,
    pub created_by: PersonId,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub bound_policy_hash: PolicyHash,
    pub bound_view_hash: ViewHash,
    pub revocation: RevocationRecord,
}

impl ExecutionEnvelope {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn is_revoked(&self) -> bool {
        self.revocation.revoked
    }
}

/// One party's signed statement of approval over an `ApprovalBundle`'s
/// content hash. The signature bytes are opaque to this engine: they are
/// produced and verified by the out-of-scope approval-submission
/// collaborator before the artifact ever reaches the multi-party gate.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApprovalArtifact {
    pub circle_id: CircleId,
    pub person_id: PersonId,
    pub bundle_content_hash: BundleContentHash,
    pub signature: Vec<u8>,
    pub presented_at: DateTime<Utc>,
    pub used: bool,
}

/// The set of approval artifacts bound to one envelope.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApprovalBundle {
    pub envelope_id: EnvelopeId,
    pub action_hash: ActionHash,
    pub content_hash: BundleContentHash,
    pub artifacts: Vec<ApprovalArtifact>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CapsPolicy {
    pub circle_daily_cap_minor: AmountMinor,
    pub intersection_daily_cap_minor: Option<AmountMinor>,
    pub payee_daily_cap_minor: Option<AmountMinor>,
    /// Rate limit on attempts per day for the circle scope. `None` means
    /// unlimited.
    pub max_attempts_per_day_circle: Option<u32>,
    /// Rate limit on attempts per day for the intersection scope, only
    /// consulted when the envelope carries an intersection id.
    pub max_attempts_per_day_intersection: Option<u32>,
}

/// A snapshot of provider/payee allowlists and caps policy, hashed and
/// bound into the envelope at seal time, re-verified at execution time.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PolicySnapshot {
    pub allowed_provider_ids: Vec<ProviderId>,
    pub blocked_provider_ids: Vec<ProviderId>,
    pub allowed_payee_ids: Vec<PayeeId>,
    pub blocked_payee_ids: Vec<PayeeId>,
    pub caps: CapsPolicy,
}

/// A snapshot of the caller's account view, hashed and bound into the
/// envelope at seal time, re-verified (and checked for staleness) at
/// execution time.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ViewSnapshot {
    pub snapshot_id: String,
    pub account_ids: Vec<String>,
    pub balance_ok: bool,
    pub shared_view_hash: String,
    pub captured_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum AttemptStatus {
    Started,
    Prepared,
    Invoked,
    Settled,
    Simulated,
    Blocked,
    Aborted,
    Revoked,
    Expired,
    Failed,
}

impl AttemptStatus {
    /// Whether this status can never transition further.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            AttemptStatus::Settled
                | AttemptStatus::Simulated
                | AttemptStatus::Blocked
                | AttemptStatus::Aborted
                | AttemptStatus::Revoked
                | AttemptStatus::Expired
                | AttemptStatus::Failed
        )
    }

    pub fn is_in_flight(self) -> bool {
        !self.is_terminal()
    }

    /// Whether reaching this status means real money moved.
    pub fn moved_money(self) -> bool {
        matches!(self, AttemptStatus::Settled)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub attempt_id: AttemptId,
    pub envelope_id: EnvelopeId,
    pub idempotency_key: IdempotencyKey,
    pub status: AttemptStatus,
    pub provider_id: ProviderId,
    pub provider_reference: Option<String>,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub trace_id: TraceId,
}

impl AttemptRecord {
    pub fn validate_transition(&self, next: AttemptStatus) -> Result<(), WardrailError> {
        if self.status.is_terminal() {
            return Err(WardrailError::AttemptTerminal(format!("{:?}", self.status)));
        }
        let ok = matches!(
            (self.status, next),
            (AttemptStatus::Started, AttemptStatus::Prepared)
                | (AttemptStatus::Started, AttemptStatus::Blocked)
                | (AttemptStatus::Started, AttemptStatus::Aborted)
                | (AttemptStatus::Started, AttemptStatus::Revoked)
                | (AttemptStatus::Started, AttemptStatus::Expired)
                | (AttemptStatus::Prepared, AttemptStatus::Invoked)
                | (AttemptStatus::Prepared, AttemptStatus::Blocked)
                | (AttemptStatus::Prepared, AttemptStatus::Aborted)
                | (AttemptStatus::Prepared, AttemptStatus::Revoked)
                | (AttemptStatus::Invoked, AttemptStatus::Settled)
                | (AttemptStatus::Invoked, AttemptStatus::Simulated)
                | (AttemptStatus::Invoked, AttemptStatus::Failed)
        );
        if ok {
            Ok(())
        } else {
            Err(WardrailError::InvalidTransition {
                from: format!("{:?}", self.status),
                to: format!("{:?}", next),
            })
        }
    }
}

/// A single scope's counters for one day, one currency.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CapsCounters {
    pub spend_minor: AmountMinor,
    pub attempt_count: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RevocationSignal {
    pub envelope_id: EnvelopeId,
    pub by_circle: Option<CircleId>,
    pub by_person: Option<PersonId>,
    pub reason: String,
    pub signalled_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuditEvent {
    pub event_type: String,
    pub envelope_id: Option<EnvelopeId>,
    pub attempt_id: Option<AttemptId>,
    pub trace_id: Option<TraceId>,
    pub at: DateTime<Utc>,
    pub detail: serde_json::Value,
}

impl AuditEvent {
    pub fn new(event_type: impl Into<String>, at: DateTime<Utc>, detail: serde_json::Value) -> Self {
        Self {
            event_type: event_type.into(),
            envelope_id: None,
            attempt_id: None,
            trace_id: None,
            at,
            detail,
        }
    }

    pub fn with_envelope(mut self, id: EnvelopeId) -> Self {
        self.envelope_id = Some(id);
        self
    }

    pub fn with_attempt(mut self, id: AttemptId) -> Self {
        self.attempt_id = Some(id);
        self
    }

    pub fn with_trace(mut self, id: TraceId) -> Self {
        self.trace_id = Some(id);
        self
    }
}

/// A recorded presentation of a bundle to one circle, ahead of the
/// multi-party gate's verification pass.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Presentation {
    pub presentation_id: PresentationId,
    pub envelope_id: EnvelopeId,
    pub circle_id: CircleId,
    pub bundle_content_hash: BundleContentHash,
    pub presented_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_statuses_reject_further_transition() {
        let rec = AttemptRecord {
            attempt_id: AttemptId::new("a1"),
            envelope_id: EnvelopeId::new("e1"),
            idempotency_key: IdempotencyKey::from_bytes([0u8; 32]),
            status: AttemptStatus::Settled,
            provider_id: ProviderId::new("mock"),
            provider_reference: None,
            started_at: Utc::now(),
            updated_at: Utc::now(),
            trace_id: TraceId::new("t1"),
        };
        assert!(rec.validate_transition(AttemptStatus::Failed).is_err());
    }

    #[test]
    fn started_can_move_to_prepared_or_blocked() {
        let rec = AttemptRecord {
            attempt_id: AttemptId::new("a1"),
            envelope_id: EnvelopeId::new("e1"),
            idempotency_key: IdempotencyKey::from_bytes([0u8; 32]),
            status: AttemptStatus::Started,
            provider_id: ProviderId::new("mock"),
            provider_reference: None,
            started_at: Utc::now(),
            updated_at: Utc::now(),
            trace_id: TraceId::new("t1"),
        };
        assert!(rec.validate_transition(AttemptStatus::Prepared).is_ok());
        assert!(rec.validate_transition(AttemptStatus::Blocked).is_ok());
        assert!(rec.validate_transition(AttemptStatus::Invoked).is_err());
    }

    #[test]
    fn simulated_does_not_count_as_moved_money() {
        assert!(!AttemptStatus::Simulated.moved_money());
        assert!(AttemptStatus::Settled.moved_money());
    }
}
