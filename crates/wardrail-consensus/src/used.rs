use std::collections::HashSet;
use std::sync::Mutex;
use wardrail_core::{ApprovalArtifact, CircleId, PersonId};

#[derive(Clone, PartialEq, Eq, Hash)]
struct ArtifactKey {
    circle_id: CircleId,
    person_id: PersonId,
    bundle_content_hash: String,
}

fn key_for(artifact: &ApprovalArtifact) -> ArtifactKey {
    ArtifactKey {
        circle_id: artifact.circle_id.clone(),
        person_id: artifact.person_id.clone(),
        bundle_content_hash: artifact.bundle_content_hash.to_hex(),
    }
}

/// Tracks which approval artifacts have already authorized a committed
/// attempt, so the same signed artifact can never authorize a second
/// one. Keyed on (circle, person, bundle content hash) rather than the
/// raw signature bytes — a replayed artifact carries the same three
/// values regardless of how it is re-encoded on the wire.
#[derive(Default)]
pub struct UsedArtifacts {
    inner: Mutex<HashSet<ArtifactKey>>,
}

impl UsedArtifacts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_used(&self, artifact: &ApprovalArtifact) -> bool {
        self.inner
            .lock()
            .expect("used-artifacts mutex poisoned")
            .contains(&key_for(artifact))
    }

    /// Marks a set of artifacts used. Called once an attempt built on
    /// them has committed to the ledger — never at gate-check time,
    /// since a gate pass can still be followed by a caps block that
    /// never starts an attempt at all.
    pub fn mark_used(&self, artifacts: &[ApprovalArtifact]) {
        let mut inner = self.inner.lock().expect("used-artifacts mutex poisoned");
        for artifact in artifacts {
            inner.insert(key_for(artifact));
        }
    }
}
