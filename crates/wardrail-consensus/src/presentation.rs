use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use wardrail_core::{BundleContentHash, CircleId, EnvelopeId, Presentation, PresentationId, WardrailError};

/// Records that a bundle was presented to a circle, ahead of that
/// circle's members signing approval artifacts against it. One mutex
/// guards the whole log; no nested locking with any other gate.
pub struct PresentationLog {
    inner: Mutex<HashMap<(EnvelopeId, CircleId), Presentation>>,
}

impl Default for PresentationLog {
    fn default() -> Self {
        Self::new()
    }
}

impl PresentationLog {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
        }
    }

    pub fn record_presentation(
        &self,
        presentation_id: PresentationId,
        envelope_id: EnvelopeId,
        circle_id: CircleId,
        bundle_content_hash: BundleContentHash,
        now: DateTime<Utc>,
    ) {
        let mut inner = self.inner.lock().expect("presentation log mutex poisoned");
        inner.insert(
            (envelope_id.clone(), circle_id.clone()),
            Presentation {
                presentation_id,
                envelope_id,
                circle_id,
                bundle_content_hash,
                presented_at: now,
            },
        );
    }

    /// Verifies that every required circle presented the bundle, with a
    /// matching content hash, within `expiry` of `now`.
    pub fn verify_all_presented(
        &self,
        envelope_id: &EnvelopeId,
        required_circles: &[CircleId],
        bundle_content_hash: &BundleContentHash,
        expiry: Duration,
        now: DateTime<Utc>,
    ) -> Result<(), WardrailError> {
        let inner = self.inner.lock().expect("presentation log mutex poisoned");
        for circle in required_circles {
            let presentation = inner.get(&(envelope_id.clone(), circle.clone()));
            match presentation {
                Some(p) if p.bundle_content_hash.to_hex() == bundle_content_hash.to_hex()
                    && now - p.presented_at <= expiry =>
                {
                    continue;
                }
                _ => {
                    return Err(WardrailError::PresentationMissingOrExpired(circle.to_string()));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expired_presentation_is_rejected() {
        let log = PresentationLog::new();
        let envelope_id = EnvelopeId::new("e1");
        let circle = CircleId::new("c1");
        let hash = BundleContentHash::from_bytes([7u8; 32]);
        let presented_at = Utc::now() - Duration::minutes(10);
        log.record_presentation(
            PresentationId::new("pr1"),
            envelope_id.clone(),
            circle.clone(),
            hash.clone(),
            presented_at,
        );
        let err = log
            .verify_all_presented(
                &envelope_id,
                &[circle],
                &hash,
                Duration::minutes(5),
                Utc::now(),
            )
            .unwrap_err();
        assert!(matches!(err, WardrailError::PresentationMissingOrExpired(_)));
    }
}
