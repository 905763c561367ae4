use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use wardrail_core::{CircleId, EnvelopeId, ExecutionEnvelope, PersonId, RevocationSignal, WardrailError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevocationWindow {
    NotStarted,
    Open,
    Closed,
    Waived,
}

impl RevocationWindow {
    pub fn can_revoke(&self) -> bool {
        matches!(self, RevocationWindow::Open | RevocationWindow::NotStarted)
    }

    pub fn classify(
        now: DateTime<Utc>,
        opens_at: DateTime<Utc>,
        closes_at: DateTime<Utc>,
        waived: bool,
    ) -> Self {
        if waived {
            RevocationWindow::Waived
        } else if now < opens_at {
            RevocationWindow::NotStarted
        } else if now <= closes_at {
            RevocationWindow::Open
        } else {
            RevocationWindow::Closed
        }
    }
}

/// Records revocation signals raised against envelopes during their
/// forced pause. One mutex; the only cross-crate effect is a value
/// returned to the caller, who applies it to the envelope through
/// `apply_to_envelope` rather than this registry reaching into the
/// envelope itself.
pub struct RevocationRegistry {
    inner: Mutex<HashMap<EnvelopeId, RevocationSignal>>,
}

impl Default for RevocationRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl RevocationRegistry {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
        }
    }

    pub fn revoke(
        &self,
        envelope_id: EnvelopeId,
        by_circle: Option<CircleId>,
        by_person: Option<PersonId>,
        reason: String,
        now: DateTime<Utc>,
    ) -> RevocationSignal {
        let signal = RevocationSignal {
            envelope_id: envelope_id.clone(),
            by_circle,
            by_person,
            reason,
            signalled_at: now,
        };
        self.inner
            .lock()
            .expect("revocation registry mutex poisoned")
            .insert(envelope_id, signal.clone());
        signal
    }

    pub fn is_revoked(&self, envelope_id: &EnvelopeId) -> bool {
        self.inner
            .lock()
            .expect("revocation registry mutex poisoned")
            .contains_key(envelope_id)
    }

    pub fn get(&self, envelope_id: &EnvelopeId) -> Option<RevocationSignal> {
        self.inner
            .lock()
            .expect("revocation registry mutex poisoned")
            .get(envelope_id)
            .cloned()
    }

    pub fn check(&self, envelope_id: &EnvelopeId) -> Result<(), WardrailError> {
        if let Some(signal) = self.get(envelope_id) {
            return Err(WardrailError::EnvelopeRevoked {
                actor: signal
                    .by_circle
                    .map(|c| c.to_string())
                    .or_else(|| signal.by_person.map(|p| p.to_string()))
                    .unwrap_or_else(|| "unknown".to_string()),
                reason: signal.reason,
            });
        }
        Ok(())
    }
}

/// Applies a revocation signal to the one mutable field a sealed
/// envelope carries.
pub fn apply_to_envelope(signal: &RevocationSignal, envelope: &mut ExecutionEnvelope) {
    envelope.revocation.revoked = true;
    envelope.revocation.by_circle = signal.by_circle.clone();
    envelope.revocation.by_person = signal.by_person.clone();
    envelope.revocation.at = Some(signal.signalled_at);
    envelope.revocation.reason = Some(signal.reason.clone());
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn revoking_during_forced_pause_is_observable_immediately() {
        let registry = RevocationRegistry::new();
        let envelope_id = EnvelopeId::new("e1");
        assert!(!registry.is_revoked(&envelope_id));
        registry.revoke(
            envelope_id.clone(),
            Some(CircleId::new("c1")),
            None,
            "changed my mind".into(),
            Utc::now(),
        );
        assert!(registry.is_revoked(&envelope_id));
        assert!(registry.check(&envelope_id).is_err());
    }

    #[test]
    fn window_closed_after_close_time() {
        let now = Utc::now();
        let w = RevocationWindow::classify(now, now - Duration::minutes(10), now - Duration::minutes(1), false);
        assert_eq!(w, RevocationWindow::Closed);
        assert!(!w.can_revoke());
    }
}
