use thiserror::Error;

#[derive(Debug, Error)]
pub enum WardrailError {
    // ── Validation errors ────────────────────────────────────────────────────
    #[error("invalid currency code: {0}")]
    InvalidCurrency(String),

    #[error("amount must be greater than zero")]
    ZeroAmount,

    #[error("free-text payee description not allowed; payee must be registered")]
    FreeTextPayeeRefused,

    #[error("envelope failed seal verification: recomputed hash does not match")]
    SealMismatch,

    #[error("malformed idempotency key: {0}")]
    MalformedIdempotencyKey(String),

    // ── Registry / gate errors ───────────────────────────────────────────────
    #[error("provider not registered: {0}")]
    ProviderNotRegistered(String),

    #[error("provider not allowed: {0}")]
    ProviderNotAllowed(String),

    #[error("live provider blocked by default: {0}")]
    LiveProviderBlocked(String),

    #[error("payee not registered: {0}")]
    PayeeNotRegistered(String),

    #[error("payee not allowed for provider {provider}: {payee}")]
    PayeeNotAllowed { payee: String, provider: String },

    #[error("payee {payee} is not registered against provider {provider}")]
    PayeeProviderMismatch { payee: String, provider: String },

    #[error("cap exceeded for scope {scope}: requested {requested}, remaining {remaining}")]
    CapExceeded {
        scope: String,
        requested: u64,
        remaining: u64,
    },

    #[error("attempt rate limit exceeded for scope {scope}: {current}/{limit}")]
    AttemptRateLimitExceeded {
        scope: String,
        current: u32,
        limit: u32,
    },

    #[error("insufficient approvals: need {need}, got {got}")]
    InsufficientApprovals { need: u32, got: u32 },

    #[error("approval bundle asymmetric: artifact does not match bundle content hash")]
    AsymmetricBundle,

    #[error("presentation missing or expired for circle {0}")]
    PresentationMissingOrExpired(String),

    #[error("neutral-language violation detected: {0}")]
    NeutralLanguageViolation(String),

    #[error("policy snapshot drift: bound hash does not match current policy")]
    PolicyDrift,

    #[error("view snapshot drift: bound hash does not match current view")]
    ViewDrift,

    #[error("view snapshot stale: age {age_secs}s exceeds max {max_secs}s")]
    ViewStale { age_secs: u64, max_secs: u64 },

    #[error("view snapshot missing")]
    ViewMissing,

    // ── Concurrency / lifecycle errors ───────────────────────────────────────
    #[error("attempt already exists for envelope {0}")]
    AttemptAlreadyExists(String),

    #[error("attempt already in flight for envelope {0}")]
    AttemptInFlight(String),

    #[error("replay blocked: idempotency key already used for a settled attempt")]
    ReplayBlocked,

    #[error("idempotency key conflict: key bound to a different attempt")]
    IdempotencyKeyConflict,

    #[error("invalid attempt status transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("attempt already in a terminal state: {0}")]
    AttemptTerminal(String),

    #[error("envelope expired at {expired_at}")]
    EnvelopeExpired { expired_at: String },

    #[error("envelope revoked by {actor}: {reason}")]
    EnvelopeRevoked { actor: String, reason: String },

    #[error("execution aborted: {0}")]
    Aborted(String),

    #[error("execution cancelled by caller")]
    CancelledByCaller,

    // ── Resource / external errors ───────────────────────────────────────────
    #[error("provider request timed out after {0}ms")]
    ProviderTimeout(u64),

    #[error("provider adapter error: {0}")]
    ProviderAdapterError(String),

    #[error("provider returned an unrecognised status: {0}")]
    ProviderUnknownStatus(String),

    #[error("oauth token request failed: {0}")]
    OAuthFailure(String),

    #[error("mock provider invariant violated: attempted to move real money")]
    MockProviderRealMoneyInvariant,

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("{0}")]
    Other(String),
}
