use async_trait::async_trait;
use wardrail_core::{AmountMinor, AttemptId, Currency, EnvelopeId, IdempotencyKey, PayeeId, ProviderId, WardrailError};

pub struct ExecCtx {
    pub envelope_id: EnvelopeId,
    pub attempt_id: AttemptId,
    pub idempotency_key: IdempotencyKey,
}

pub struct PrepareRequest {
    pub payee_id: PayeeId,
    pub amount_minor: AmountMinor,
    pub currency: Currency,
}

pub struct PrepareOutcome {
    pub accepted: bool,
    pub detail: Option<String>,
}

pub struct ExecuteRequest {
    pub payee_id: PayeeId,
    pub amount_minor: AmountMinor,
    pub currency: Currency,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecuteStatus {
    Settled,
    Simulated,
    Failed,
}

pub struct ExecuteOutcome {
    pub status: ExecuteStatus,
    pub provider_reference: String,
    pub real_money_moved: bool,
}

/// The narrow, dynamic-dispatch boundary between the executor and a
/// payment provider. No provider implementation may block on anything
/// other than its own I/O; the executor treats every call here as one
/// of the pipeline's two permitted blocking regions.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    fn provider_id(&self) -> &ProviderId;

    async fn prepare(&self, ctx: &ExecCtx, req: &PrepareRequest) -> Result<PrepareOutcome, WardrailError>;

    async fn execute(&self, ctx: &ExecCtx, req: &ExecuteRequest) -> Result<ExecuteOutcome, WardrailError>;

    async fn abort(&self, ctx: &ExecCtx) -> Result<(), WardrailError>;
}
