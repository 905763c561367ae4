use std::collections::HashMap;
use std::sync::Mutex;
use wardrail_core::{PayeeId, ProviderId, WardrailError};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProviderEnvironment {
    Mock,
    Sandbox,
    Live,
}

#[derive(Clone, Debug)]
pub struct ProviderEntry {
    pub id: ProviderId,
    pub environment: ProviderEnvironment,
    pub allowed: bool,
}

/// The allowlist of payment providers this engine may call. A single
/// mutex guards the map; the only mutation path outside construction is
/// test-only (there is no "register a provider at runtime" operation in
/// the caller surface — providers are a deployment-time decision).
pub struct ProviderRegistry {
    inner: Mutex<HashMap<ProviderId, ProviderEntry>>,
    live_enabled: bool,
}

impl ProviderRegistry {
    pub fn new(entries: Vec<ProviderEntry>, live_enabled: bool) -> Self {
        let map = entries.into_iter().map(|e| (e.id.clone(), e)).collect();
        Self {
            inner: Mutex::new(map),
            live_enabled,
        }
    }

    /// The default registry: `mock` and `sandbox` allowed, `live`
    /// registered but blocked unless the caller explicitly enables it —
    /// the allowlist equivalent of a founding, code-defined allocation
    /// rather than something populated from user input.
    pub fn default_seeded(live_enabled: bool) -> Self {
        Self::new(
            vec![
                ProviderEntry {
                    id: ProviderId::new("mock"),
                    environment: ProviderEnvironment::Mock,
                    allowed: true,
                },
                ProviderEntry {
                    id: ProviderId::new("sandbox"),
                    environment: ProviderEnvironment::Sandbox,
                    allowed: true,
                },
                ProviderEntry {
                    id: ProviderId::new("live"),
                    environment: ProviderEnvironment::Live,
                    allowed: true,
                },
            ],
            live_enabled,
        )
    }

    pub fn get(&self, id: &ProviderId) -> Option<ProviderEntry> {
        self.inner.lock().expect("provider registry mutex poisoned").get(id).cloned()
    }

    pub fn list(&self) -> Vec<ProviderEntry> {
        let inner = self.inner.lock().expect("provider registry mutex poisoned");
        let mut v: Vec<_> = inner.values().cloned().collect();
        v.sort_by(|a, b| a.id.as_str().cmp(b.id.as_str()));
        v
    }

    pub fn is_live(&self, id: &ProviderId) -> bool {
        self.get(id)
            .map(|e| e.environment == ProviderEnvironment::Live)
            .unwrap_or(false)
    }

    pub fn require_allowed(&self, id: &ProviderId) -> Result<ProviderEntry, WardrailError> {
        let entry = self
            .get(id)
            .ok_or_else(|| WardrailError::ProviderNotRegistered(id.to_string()))?;
        if entry.environment == ProviderEnvironment::Live && !self.live_enabled {
            return Err(WardrailError::LiveProviderBlocked(id.to_string()));
        }
        if !entry.allowed {
            return Err(WardrailError::ProviderNotAllowed(id.to_string()));
        }
        Ok(entry)
    }

    pub fn allowed_ids(&self) -> Vec<ProviderId> {
        self.list()
            .into_iter()
            .filter(|e| e.allowed && (e.environment != ProviderEnvironment::Live || self.live_enabled))
            .map(|e| e.id)
            .collect()
    }

    pub fn blocked_ids(&self) -> Vec<ProviderId> {
        self.list()
            .into_iter()
            .filter(|e| !e.allowed || (e.environment == ProviderEnvironment::Live && !self.live_enabled))
            .map(|e| e.id)
            .collect()
    }
}

#[derive(Clone, Debug)]
pub struct PayeeEntry {
    pub payee_id: PayeeId,
    pub provider_id: ProviderId,
    pub allowed: bool,
}

/// Keyed by `(PayeeId, ProviderId)`: a payee is only reachable through
/// the providers it was explicitly registered against.
pub struct PayeeRegistry {
    inner: Mutex<HashMap<(PayeeId, ProviderId), PayeeEntry>>,
}

impl PayeeRegistry {
    pub fn new(entries: Vec<PayeeEntry>) -> Self {
        let map = entries
            .into_iter()
            .map(|e| ((e.payee_id.clone(), e.provider_id.clone()), e))
            .collect();
        Self {
            inner: Mutex::new(map),
        }
    }

    pub fn default_seeded() -> Self {
        Self::new(vec![
            PayeeEntry {
                payee_id: PayeeId::new("payee-sandbox-1"),
                provider_id: ProviderId::new("mock"),
                allowed: true,
            },
            PayeeEntry {
                payee_id: PayeeId::new("payee-sandbox-1"),
                provider_id: ProviderId::new("sandbox"),
                allowed: true,
            },
            PayeeEntry {
                payee_id: PayeeId::new("payee-sandbox-2"),
                provider_id: ProviderId::new("sandbox"),
                allowed: true,
            },
        ])
    }

    pub fn require_allowed(
        &self,
        payee_id: &PayeeId,
        provider_id: &ProviderId,
    ) -> Result<(), WardrailError> {
        let inner = self.inner.lock().expect("payee registry mutex poisoned");
        let any_registration = inner.keys().any(|(p, _)| p == payee_id);
        if !any_registration {
            return Err(WardrailError::PayeeNotRegistered(payee_id.to_string()));
        }
        match inner.get(&(payee_id.clone(), provider_id.clone())) {
            Some(entry) if entry.allowed => Ok(()),
            Some(_) => Err(WardrailError::PayeeNotAllowed {
                payee: payee_id.to_string(),
                provider: provider_id.to_string(),
            }),
            None => Err(WardrailError::PayeeProviderMismatch {
                payee: payee_id.to_string(),
                provider: provider_id.to_string(),
            }),
        }
    }

    pub fn allowed_ids(&self) -> Vec<PayeeId> {
        let inner = self.inner.lock().expect("payee registry mutex poisoned");
        let mut ids: Vec<_> = inner
            .values()
            .filter(|e| e.allowed)
            .map(|e| e.payee_id.clone())
            .collect();
        ids.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        ids.dedup_by(|a, b| a.as_str() == b.as_str());
        ids
    }

    pub fn list(&self) -> Vec<PayeeEntry> {
        let inner = self.inner.lock().expect("payee registry mutex poisoned");
        let mut v: Vec<_> = inner.values().cloned().collect();
        v.sort_by(|a, b| (a.payee_id.as_str(), a.provider_id.as_str()).cmp(&(b.payee_id.as_str(), b.provider_id.as_str())));
        v
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn live_provider_blocked_by_default() {
        let registry = ProviderRegistry::default_seeded(false);
        let err = registry.require_allowed(&ProviderId::new("live")).unwrap_err();
        assert!(matches!(err, WardrailError::LiveProviderBlocked(_)));
    }

    #[test]
    fn live_provider_allowed_when_explicitly_enabled() {
        let registry = ProviderRegistry::default_seeded(true);
        assert!(registry.require_allowed(&ProviderId::new("live")).is_ok());
    }

    #[test]
    fn free_text_payee_is_simply_not_registered() {
        let registry = PayeeRegistry::default_seeded();
        let err = registry
            .require_allowed(&PayeeId::new("whoever-i-type"), &ProviderId::new("sandbox"))
            .unwrap_err();
        assert!(matches!(err, WardrailError::PayeeNotRegistered(_)));
    }

    #[test]
    fn payee_registered_against_one_provider_not_usable_on_another() {
        let registry = PayeeRegistry::new(vec![PayeeEntry {
            payee_id: PayeeId::new("payee-x"),
            provider_id: ProviderId::new("sandbox"),
            allowed: true,
        }]);
        let err = registry
            .require_allowed(&PayeeId::new("payee-x"), &ProviderId::new("mock"))
            .unwrap_err();
        assert!(matches!(err, WardrailError::PayeeProviderMismatch { .. }));
    }
}
