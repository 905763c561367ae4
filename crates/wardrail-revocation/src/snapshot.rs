use chrono::{DateTime, Utc};
use wardrail_core::{CapsPolicy, ExecutionEnvelope, PolicyHash, PolicySnapshot, ViewHash, ViewSnapshot, WardrailError};
use wardrail_crypto::canonical_hash;

use crate::registry::{PayeeRegistry, ProviderRegistry};

fn canonical_policy(snapshot: &PolicySnapshot) -> String {
    use wardrail_crypto::CanonicalWriter;
    CanonicalWriter::new()
        .sorted_list(
            "allowed_providers",
            snapshot.allowed_provider_ids.iter().map(|p| p.to_string()).collect(),
        )
        .sorted_list(
            "blocked_providers",
            snapshot.blocked_provider_ids.iter().map(|p| p.to_string()).collect(),
        )
        .sorted_list(
            "allowed_payees",
            snapshot.allowed_payee_ids.iter().map(|p| p.to_string()).collect(),
        )
        .sorted_list(
            "blocked_payees",
            snapshot.blocked_payee_ids.iter().map(|p| p.to_string()).collect(),
        )
        .field("circle_cap", snapshot.caps.circle_daily_cap_minor)
        .finish()
}

pub fn policy_snapshot_hash(snapshot: &PolicySnapshot) -> PolicyHash {
    PolicyHash::from_bytes(canonical_hash(&canonical_policy(snapshot)))
}

fn canonical_view(snapshot: &ViewSnapshot) -> String {
    use wardrail_crypto::CanonicalWriter;
    CanonicalWriter::new()
        .field("snapshot_id", &snapshot.snapshot_id)
        .sorted_list("accounts", snapshot.account_ids.clone())
        .field("balance_ok", snapshot.balance_ok)
        .field("shared_view_hash", &snapshot.shared_view_hash)
        .finish()
}

pub fn view_snapshot_hash(snapshot: &ViewSnapshot) -> ViewHash {
    ViewHash::from_bytes(canonical_hash(&canonical_view(snapshot)))
}

/// Builds the current `PolicySnapshot` from live registry state, for
/// recomputation at verification time.
pub fn current_policy_snapshot(
    providers: &ProviderRegistry,
    payees: &PayeeRegistry,
    caps: CapsPolicy,
) -> PolicySnapshot {
    PolicySnapshot {
        allowed_provider_ids: providers.allowed_ids(),
        blocked_provider_ids: providers.blocked_ids(),
        allowed_payee_ids: payees.allowed_ids(),
        blocked_payee_ids: vec![],
        caps,
    }
}

/// Recomputes the current policy snapshot and checks it against the
/// hash bound into the envelope at seal time.
pub fn verify_policy(
    envelope: &ExecutionEnvelope,
    current: &PolicySnapshot,
) -> Result<(), WardrailError> {
    let current_hash = policy_snapshot_hash(current);
    if current_hash.to_hex() != envelope.bound_policy_hash.to_hex() {
        return Err(WardrailError::PolicyDrift);
    }
    Ok(())
}

pub trait ViewProvider: Send + Sync {
    fn current_view(&self) -> Option<ViewSnapshot>;
}

/// Recomputes (via `views`) the current view snapshot and checks both
/// its hash against the bound value and its age against `max_staleness`.
pub fn verify_view(
    envelope: &ExecutionEnvelope,
    views: &dyn ViewProvider,
    max_staleness: chrono::Duration,
    now: DateTime<Utc>,
) -> Result<(), WardrailError> {
    let current = views.current_view().ok_or(WardrailError::ViewMissing)?;
    let current_hash = view_snapshot_hash(&current);
    if current_hash.to_hex() != envelope.bound_view_hash.to_hex() {
        return Err(WardrailError::ViewDrift);
    }
    let age = now.signed_duration_since(current.captured_at);
    if age > max_staleness {
        return Err(WardrailError::ViewStale {
            age_secs: age.num_seconds().max(0) as u64,
            max_secs: max_staleness.num_seconds().max(0) as u64,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wardrail_core::ProviderId;

    #[test]
    fn policy_hash_is_deterministic_regardless_of_list_order() {
        let a = PolicySnapshot {
            allowed_provider_ids: vec![ProviderId::new("mock"), ProviderId::new("sandbox")],
            blocked_provider_ids: vec![],
            allowed_payee_ids: vec![],
            blocked_payee_ids: vec![],
            caps: CapsPolicy {
                circle_daily_cap_minor: 1000,
                intersection_daily_cap_minor: None,
                payee_daily_cap_minor: None,
                max_attempts_per_day_circle: None,
                max_attempts_per_day_intersection: None,
            },
        };
        let b = PolicySnapshot {
            allowed_provider_ids: vec![ProviderId::new("sandbox"), ProviderId::new("mock")],
            ..a.clone()
        };
        assert_eq!(policy_snapshot_hash(&a).to_hex(), policy_snapshot_hash(&b).to_hex());
    }
}
