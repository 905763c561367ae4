use wardrail_core::{ApprovalBundle, WardrailError};

/// Verifies that every artifact in a bundle was signed over the bundle's
/// own content hash — i.e. that no party approved a different version of
/// the envelope than the others. A single mismatched artifact fails the
/// whole bundle.
pub fn verify_symmetry(bundle: &ApprovalBundle) -> Result<(), WardrailError> {
    for artifact in &bundle.artifacts {
        if artifact.bundle_content_hash.to_hex() != bundle.content_hash.to_hex() {
            return Err(WardrailError::AsymmetricBundle);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use wardrail_core::{ApprovalArtifact, BundleContentHash, CircleId, EnvelopeId, PersonId, ActionHash};

    fn bundle_with(hashes: Vec<[u8; 32]>, content_hash: [u8; 32]) -> ApprovalBundle {
        ApprovalBundle {
            envelope_id: EnvelopeId::new("e1"),
            action_hash: ActionHash::from_bytes([0u8; 32]),
            content_hash: BundleContentHash::from_bytes(content_hash),
            artifacts: hashes
                .into_iter()
                .enumerate()
                .map(|(i, h)| ApprovalArtifact {
                    circle_id: CircleId::new(format!("c{i}")),
                    person_id: PersonId::new(format!("p{i}")),
                    bundle_content_hash: BundleContentHash::from_bytes(h),
                    signature: vec![],
                    presented_at: Utc::now(),
                    used: false,
                })
                .collect(),
        }
    }

    #[test]
    fn matching_hashes_pass() {
        let bundle = bundle_with(vec![[1u8; 32], [1u8; 32]], [1u8; 32]);
        assert!(verify_symmetry(&bundle).is_ok());
    }

    #[test]
    fn one_asymmetric_artifact_fails_the_whole_bundle() {
        let bundle = bundle_with(vec![[1u8; 32], [2u8; 32]], [1u8; 32]);
        assert!(matches!(
            verify_symmetry(&bundle),
            Err(WardrailError::AsymmetricBundle)
        ));
    }
}
