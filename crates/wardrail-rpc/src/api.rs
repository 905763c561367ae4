use jsonrpsee::core::RpcResult;
use jsonrpsee::proc_macros::rpc;

use crate::types::{
    RpcAttempt, RpcAuditEvent, RpcCapsScope, RpcExecResult, RpcExecuteRequest, RpcPayee,
    RpcPresentationRequest, RpcProvider, RpcRevocationRequest, RpcRevocationSignal, RpcVersionInfo,
};

/// JSON-RPC 2.0 API for the guarded payment execution engine.
///
/// All method names are prefixed with "wardrail_" via `namespace = "wardrail"`.
#[rpc(server, namespace = "wardrail")]
pub trait WardrailApi {
    /// Run the execution pipeline for a sealed envelope and approval
    /// bundle. Blocks for the configured forced-pause duration before
    /// returning.
    #[method(name = "execute")]
    async fn execute(&self, request: RpcExecuteRequest) -> RpcResult<RpcExecResult>;

    /// Look up an attempt by id.
    #[method(name = "getAttempt")]
    async fn get_attempt(&self, attempt_id: String) -> RpcResult<Option<RpcAttempt>>;

    /// Raise a revocation signal against an envelope. Observable by any
    /// in-flight execution on the next forced-pause poll tick.
    #[method(name = "revoke")]
    async fn revoke(&self, request: RpcRevocationRequest) -> RpcResult<RpcRevocationSignal>;

    /// Record that a circle presented an approval bundle, ahead of the
    /// multi-party gate's verification pass.
    #[method(name = "presentBundle")]
    async fn present_bundle(&self, request: RpcPresentationRequest) -> RpcResult<()>;

    /// Evaluate (without mutating) the caps/rate-limit state for a
    /// circle, for today, in the given currency.
    #[method(name = "getCapsStatus")]
    async fn get_caps_status(&self, circle_id: String, currency: String) -> RpcResult<Vec<RpcCapsScope>>;

    /// List the registered payment providers and whether each is
    /// currently allowed.
    #[method(name = "getProviders")]
    async fn get_providers(&self) -> RpcResult<Vec<RpcProvider>>;

    /// List the registered payees and whether each is currently allowed.
    #[method(name = "getPayees")]
    async fn get_payees(&self) -> RpcResult<Vec<RpcPayee>>;

    /// Return the most recent audit events, newest last, capped at
    /// `limit` (max 500).
    #[method(name = "getAuditTrail")]
    async fn get_audit_trail(&self, limit: u32) -> RpcResult<Vec<RpcAuditEvent>>;

    /// Return node and protocol version information.
    #[method(name = "getVersion")]
    async fn get_version(&self) -> RpcResult<RpcVersionInfo>;
}
