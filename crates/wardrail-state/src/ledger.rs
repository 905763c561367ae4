use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{info, warn};
use wardrail_core::{
    AttemptId, AttemptRecord, AttemptStatus, AuditEvent, EnvelopeId, IdempotencyKey, ProviderId,
    TraceId, WardrailError,
};

struct LedgerInner {
    by_attempt: HashMap<AttemptId, AttemptRecord>,
    by_envelope: HashMap<EnvelopeId, Vec<AttemptId>>,
    by_idempotency_key: HashMap<IdempotencyKey, AttemptId>,
}

/// The single source of truth for attempt lifecycle and replay
/// prevention. One mutex guards all three indices; no other component's
/// lock is ever held while this one is held, and this one is never held
/// while waiting on provider I/O or the forced pause.
pub struct AttemptLedger {
    inner: Mutex<LedgerInner>,
}

impl Default for AttemptLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl AttemptLedger {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(LedgerInner {
                by_attempt: HashMap::new(),
                by_envelope: HashMap::new(),
                by_idempotency_key: HashMap::new(),
            }),
        }
    }

    /// Refuses to start a second attempt for an envelope whose only
    /// existing attempt is non-terminal; once every prior attempt for the
    /// envelope is terminal, a new attempt may start (e.g. after a
    /// `Blocked` result from an earlier gate failure on the same
    /// envelope, when the caller is allowed to retry under a fresh
    /// idempotency key).
    pub fn start_attempt(
        &self,
        attempt_id: AttemptId,
        envelope_id: EnvelopeId,
        idempotency_key: IdempotencyKey,
        provider_id: ProviderId,
        trace_id: TraceId,
        now: DateTime<Utc>,
    ) -> Result<AttemptRecord, WardrailError> {
        let mut inner = self.inner.lock().expect("ledger mutex poisoned");

        if inner.by_attempt.contains_key(&attempt_id) {
            return Err(WardrailError::AttemptAlreadyExists(attempt_id.to_string()));
        }

        if let Some(existing_key_owner) = inner.by_idempotency_key.get(&idempotency_key) {
            let existing = inner
                .by_attempt
                .get(existing_key_owner)
                .expect("index consistency");
            if existing.status.is_terminal() {
                warn!(attempt = %attempt_id, "replay blocked: idempotency key reused");
                return Err(WardrailError::ReplayBlocked);
            }
            return Err(WardrailError::IdempotencyKeyConflict);
        }

        if let Some(existing_attempts) = inner.by_envelope.get(&envelope_id) {
            let any_in_flight = existing_attempts.iter().any(|id| {
                inner
                    .by_attempt
                    .get(id)
                    .map(|a| a.status.is_in_flight())
                    .unwrap_or(false)
            });
            if any_in_flight {
                return Err(WardrailError::AttemptInFlight(envelope_id.to_string()));
            }
        }

        let record = AttemptRecord {
            attempt_id: attempt_id.clone(),
            envelope_id: envelope_id.clone(),
            idempotency_key: idempotency_key.clone(),
            status: AttemptStatus::Started,
            provider_id,
            provider_reference: None,
            started_at: now,
            updated_at: now,
            trace_id,
        };

        inner.by_attempt.insert(attempt_id.clone(), record.clone());
        inner
            .by_envelope
            .entry(envelope_id)
            .or_default()
            .push(attempt_id.clone());
        inner.by_idempotency_key.insert(idempotency_key, attempt_id.clone());

        info!(attempt = %attempt_id, "ledger entry created");
        Ok(record)
    }

    pub fn update_status(
        &self,
        attempt_id: &AttemptId,
        next: AttemptStatus,
        provider_reference: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<AttemptRecord, WardrailError> {
        let mut inner = self.inner.lock().expect("ledger mutex poisoned");
        let record = inner
            .by_attempt
            .get_mut(attempt_id)
            .ok_or_else(|| WardrailError::Other(format!("unknown attempt {attempt_id}")))?;
        record.validate_transition(next)?;
        record.status = next;
        record.updated_at = now;
        if provider_reference.is_some() {
            record.provider_reference = provider_reference;
        }
        Ok(record.clone())
    }

    /// Moves an attempt directly to a terminal status, used on every exit
    /// path of the executor (settled, simulated, blocked, aborted,
    /// revoked, expired, failed).
    pub fn finalize_attempt(
        &self,
        attempt_id: &AttemptId,
        terminal: AttemptStatus,
        provider_reference: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<AttemptRecord, WardrailError> {
        if !terminal.is_terminal() {
            return Err(WardrailError::Other(format!(
                "{terminal:?} is not a terminal status"
            )));
        }
        let record = self.update_status(attempt_id, terminal, provider_reference, now)?;
        info!(attempt = %attempt_id, status = ?record.status, "attempt finalized");
        Ok(record)
    }

    pub fn check_replay(&self, idempotency_key: &IdempotencyKey) -> Option<AttemptRecord> {
        let inner = self.inner.lock().expect("ledger mutex poisoned");
        inner
            .by_idempotency_key
            .get(idempotency_key)
            .and_then(|id| inner.by_attempt.get(id))
            .filter(|a| a.status.is_terminal())
            .cloned()
    }

    pub fn get(&self, attempt_id: &AttemptId) -> Option<AttemptRecord> {
        let inner = self.inner.lock().expect("ledger mutex poisoned");
        inner.by_attempt.get(attempt_id).cloned()
    }

    pub fn audit_entry_created(attempt_id: AttemptId, envelope_id: EnvelopeId, now: DateTime<Utc>) -> AuditEvent {
        AuditEvent::new("ledger.entry.created", now, serde_json::json!({}))
            .with_attempt(attempt_id)
            .with_envelope(envelope_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(n: u8) -> IdempotencyKey {
        IdempotencyKey::from_bytes([n; 32])
    }

    #[test]
    fn second_attempt_for_same_envelope_while_first_in_flight_is_blocked() {
        let ledger = AttemptLedger::new();
        let now = Utc::now();
        ledger
            .start_attempt(
                AttemptId::new("a1"),
                EnvelopeId::new("e1"),
                key(1),
                ProviderId::new("mock"),
                TraceId::new("t1"),
                now,
            )
            .unwrap();
        let err = ledger
            .start_attempt(
                AttemptId::new("a2"),
                EnvelopeId::new("e1"),
                key(2),
                ProviderId::new("mock"),
                TraceId::new("t2"),
                now,
            )
            .unwrap_err();
        assert!(matches!(err, WardrailError::AttemptInFlight(_)));
    }

    #[test]
    fn reusing_a_settled_idempotency_key_is_replay_blocked() {
        let ledger = AttemptLedger::new();
        let now = Utc::now();
        ledger
            .start_attempt(
                AttemptId::new("a1"),
                EnvelopeId::new("e1"),
                key(1),
                ProviderId::new("mock"),
                TraceId::new("t1"),
                now,
            )
            .unwrap();
        ledger
            .update_status(&AttemptId::new("a1"), AttemptStatus::Prepared, None, now)
            .unwrap();
        ledger
            .update_status(&AttemptId::new("a1"), AttemptStatus::Invoked, None, now)
            .unwrap();
        ledger
            .finalize_attempt(&AttemptId::new("a1"), AttemptStatus::Settled, Some("ref-1".into()), now)
            .unwrap();

        let err = ledger
            .start_attempt(
                AttemptId::new("a2"),
                EnvelopeId::new("e1"),
                key(1),
                ProviderId::new("mock"),
                TraceId::new("t2"),
                now,
            )
            .unwrap_err();
        assert!(matches!(err, WardrailError::ReplayBlocked));
    }

    #[test]
    fn new_attempt_allowed_once_prior_attempt_is_terminal_but_not_replayed() {
        let ledger = AttemptLedger::new();
        let now = Utc::now();
        ledger
            .start_attempt(
                AttemptId::new("a1"),
                EnvelopeId::new("e1"),
                key(1),
                ProviderId::new("mock"),
                TraceId::new("t1"),
                now,
            )
            .unwrap();
        ledger
            .finalize_attempt(&AttemptId::new("a1"), AttemptStatus::Blocked, None, now)
            .unwrap();

        let rec = ledger
            .start_attempt(
                AttemptId::new("a2"),
                EnvelopeId::new("e1"),
                key(2),
                ProviderId::new("mock"),
                TraceId::new("t2"),
                now,
            )
            .unwrap();
        assert_eq!(rec.status, AttemptStatus::Started);
    }
}
