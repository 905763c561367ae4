use async_trait::async_trait;
use wardrail_core::{ProviderId, WardrailError};

use crate::adapter::{ExecCtx, ExecuteOutcome, ExecuteRequest, ExecuteStatus, PrepareOutcome, PrepareRequest, ProviderAdapter};

/// A provider that never talks to anything outside this process. Used
/// for tests and the demo node. `simulate_only` is always `true` in
/// every real construction path — the `allow_real_money_for_tests` flag
/// exists solely so the invariant test below can prove the guard fires;
/// nothing in `wardrail-node` ever sets it.
pub struct MockProvider {
    id: ProviderId,
    allow_real_money_for_tests: bool,
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            id: ProviderId::new("mock"),
            allow_real_money_for_tests: false,
        }
    }

    #[cfg(test)]
    pub fn with_real_money_allowed_for_tests() -> Self {
        Self {
            id: ProviderId::new("mock"),
            allow_real_money_for_tests: true,
        }
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProviderAdapter for MockProvider {
    fn provider_id(&self) -> &ProviderId {
        &self.id
    }

    async fn prepare(&self, _ctx: &ExecCtx, _req: &PrepareRequest) -> Result<PrepareOutcome, WardrailError> {
        Ok(PrepareOutcome {
            accepted: true,
            detail: Some("mock prepare always accepts".into()),
        })
    }

    async fn execute(&self, ctx: &ExecCtx, _req: &ExecuteRequest) -> Result<ExecuteOutcome, WardrailError> {
        if self.allow_real_money_for_tests {
            // The mock provider must never move real money; this branch
            // exists only so a misconfiguration trips loudly in every
            // build profile rather than silently in release.
            panic!("MockProvider invariant violated: attempted to move real money");
        }
        Ok(ExecuteOutcome {
            status: ExecuteStatus::Simulated,
            provider_reference: format!("mock-{}", ctx.attempt_id),
            real_money_moved: false,
        })
    }

    async fn abort(&self, _ctx: &ExecCtx) -> Result<(), WardrailError> {
        Ok(())
    }
}
