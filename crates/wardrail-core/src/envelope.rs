use crate::model::{ActionSpec, Clock, ExecutionEnvelope, RevocationRecord};
use crate::types::{ActionHash, CircleId, EnvelopeId, IntersectionId, PersonId, PolicyHash, SealHash, ViewHash};
use chrono::Duration;
use wardrail_crypto::CanonicalWriter;

/// The only constructor for a sealed `ExecutionEnvelope`. Once `seal()`
/// returns, the action, hashes, and bound snapshot hashes are fixed for
/// the envelope's lifetime; nothing downstream of this builder can
/// mutate them.
pub struct EnvelopeBuilder {
    envelope_id: EnvelopeId,
    action: ActionSpec,
    circle_id: CircleId,
    intersection_id: Option<IntersectionId>,
    created_by: PersonId,
    expiry: Duration,
    policy_hash: PolicyHash,
    view_hash: ViewHash,
}

impl EnvelopeBuilder {
    pub fn new(
        envelope_id: EnvelopeId,
        action: ActionSpec,
        circle_id: CircleId,
        created_by: PersonId,
        policy_hash: PolicyHash,
        view_hash: ViewHash,
    ) -> Self {
        Self {
            envelope_id,
            action,
            circle_id,
            intersection_id: None,
            created_by,
            expiry: Duration::minutes(5),
            policy_hash,
            view_hash,
        }
    }

    pub fn intersection(mut self, id: IntersectionId) -> Self {
        self.intersection_id = Some(id);
        self
    }

    pub fn expiry(mut self, d: Duration) -> Self {
        self.expiry = d;
        self
    }

    fn action_canonical(&self) -> String {
        CanonicalWriter::new()
            .field("amount_minor", self.action.amount_minor)
            .field("currency", self.action.currency.as_str())
            .field("payee_id", self.action.payee_id.as_str())
            .field("provider_id", self.action.provider_id.as_str())
            .field("kind", format!("{:?}", self.action.kind))
            .finish()
    }

    pub fn seal(self, clock: &dyn Clock) -> ExecutionEnvelope {
        let action_hash = ActionHash::from_bytes(wardrail_crypto::canonical_hash(&self.action_canonical()));
        let now = clock.now();

        let seal_canonical = CanonicalWriter::new()
            .field("envelope_id", self.envelope_id.as_str())
            .field("action_hash", action_hash.to_hex())
            .field("circle_id", self.circle_id.as_str())
            .field("created_by", self.created_by.as_str())
            .field("policy_hash", self.policy_hash.to_hex())
            .field("view_hash", self.view_hash.to_hex())
            .finish();
        let seal_hash = SealHash::from_bytes(wardrail_crypto::canonical_hash(&seal_canonical));

        ExecutionEnvelope {
            envelope_id: self.envelope_id,
            action: self.action,
            action_hash,
            seal_hash,
            circle_id: self.circle_id,
            intersection_id: self.intersection_id,
            created_by: self.created_by,
            created_at: now,
            expires_at: now + self.expiry,
            bound_policy_hash: self.policy_hash,
            bound_view_hash: self.view_hash,
            revocation: RevocationRecord::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ActionKind, SystemClock};
    use crate::types::{Currency, PayeeId, ProviderId};

    fn action() -> ActionSpec {
        ActionSpec {
            amount_minor: 5000,
            currency: Currency::parse("GBP").unwrap(),
            payee_id: PayeeId::new("payee-1"),
            provider_id: ProviderId::new("sandbox"),
            description: None,
            kind: ActionKind::Payment,
        }
    }

    #[test]
    fn sealing_is_deterministic_for_identical_inputs() {
        let clock = SystemClock;
        let e1 = EnvelopeBuilder::new(
            EnvelopeId::new("e1"),
            action(),
            CircleId::new("c1"),
            PersonId::new("p1"),
            PolicyHash::from_bytes([1u8; 32]),
            ViewHash::from_bytes([2u8; 32]),
        )
        .seal(&clock);
        let e2 = EnvelopeBuilder::new(
            EnvelopeId::new("e1"),
            action(),
            CircleId::new("c1"),
            PersonId::new("p1"),
            PolicyHash::from_bytes([1u8; 32]),
            ViewHash::from_bytes([2u8; 32]),
        )
        .seal(&clock);
        assert_eq!(e1.action_hash.to_hex(), e2.action_hash.to_hex());
    }

    #[test]
    fn changing_amount_changes_action_hash_not_seal_inputs_shape() {
        let clock = SystemClock;
        let mut a2 = action();
        a2.amount_minor = 9999;
        let e1 = EnvelopeBuilder::new(
            EnvelopeId::new("e1"),
            action(),
            CircleId::new("c1"),
            PersonId::new("p1"),
            PolicyHash::from_bytes([1u8; 32]),
            ViewHash::from_bytes([2u8; 32]),
        )
        .seal(&clock);
        let e2 = EnvelopeBuilder::new(
            EnvelopeId::new("e1"),
            a2,
            CircleId::new("c1"),
            PersonId::new("p1"),
            PolicyHash::from_bytes([1u8; 32]),
            ViewHash::from_bytes([2u8; 32]),
        )
        .seal(&clock);
        assert_ne!(e1.action_hash.to_hex(), e2.action_hash.to_hex());
    }
}
