use std::net::SocketAddr;
use std::sync::Arc;

use jsonrpsee::core::{async_trait, RpcResult};
use jsonrpsee::server::{Server, ServerHandle};
use jsonrpsee::types::ErrorObject;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use wardrail_core::{
    AttemptId, CapsPolicy, CircleId, Clock, Currency, EnvelopeId, PersonId,
};
use wardrail_executor::{CollectingAuditSink, ExecRequest, Executor};
use wardrail_state::CapsCheckRequest;

use crate::api::WardrailApiServer;
use crate::types::{
    RpcAttempt, RpcAuditEvent, RpcCapsScope, RpcExecResult, RpcExecuteRequest, RpcPayee,
    RpcPresentationRequest, RpcProvider, RpcRevocationRequest, RpcRevocationSignal, RpcVersionInfo,
};

fn rpc_err(code: i32, msg: impl Into<String>) -> ErrorObject<'static> {
    ErrorObject::owned(code, msg.into(), None::<()>)
}

/// Shared state passed to the RPC server: the wired executor, plus a
/// handle to whichever audit sink the node constructed it with (so
/// `wardrail_getAuditTrail` has something to read back from).
pub struct RpcServerState {
    pub executor: Arc<Executor>,
    pub audit: Arc<CollectingAuditSink>,
}

/// The RPC server implementation.
pub struct RpcServer {
    state: Arc<RpcServerState>,
}

impl RpcServer {
    pub fn new(state: Arc<RpcServerState>) -> Self {
        Self { state }
    }

    /// Start the JSON-RPC server on `addr` with permissive CORS headers. Returns a handle to stop it.
    pub async fn start(self, addr: SocketAddr) -> anyhow::Result<ServerHandle> {
        let cors = CorsLayer::new()
            .allow_methods(Any)
            .allow_origin(Any)
            .allow_headers(Any);

        let server = Server::builder()
            .set_http_middleware(tower::ServiceBuilder::new().layer(cors))
            .build(addr)
            .await?;

        let module = self.into_rpc();
        let handle = server.start(module);
        info!(%addr, "RPC server started");
        Ok(handle)
    }
}

#[async_trait]
impl WardrailApiServer for RpcServer {
    async fn execute(&self, request: RpcExecuteRequest) -> RpcResult<RpcExecResult> {
        let exec_request = ExecRequest {
            envelope: request.envelope,
            attempt_id: AttemptId::new(request.attempt_id),
            trace_id: wardrail_core::TraceId::new(request.trace_id),
            bundle: request.bundle,
        };
        self.state
            .executor
            .execute(exec_request)
            .await
            .map(RpcExecResult::from)
            .map_err(|e| rpc_err(-32603, e.to_string()))
    }

    async fn get_attempt(&self, attempt_id: String) -> RpcResult<Option<RpcAttempt>> {
        Ok(self
            .state
            .executor
            .ledger
            .get(&AttemptId::new(attempt_id))
            .map(RpcAttempt::from))
    }

    async fn revoke(&self, request: RpcRevocationRequest) -> RpcResult<RpcRevocationSignal> {
        let now = self.state.executor.clock.now();
        let signal = self.state.executor.revocations.revoke(
            EnvelopeId::new(request.envelope_id),
            request.by_circle.map(CircleId::new),
            request.by_person.map(PersonId::new),
            request.reason,
            now,
        );
        Ok(RpcRevocationSignal::from(signal))
    }

    async fn present_bundle(&self, request: RpcPresentationRequest) -> RpcResult<()> {
        let hash = wardrail_core::BundleContentHash::from_hex(&request.bundle_content_hash)
            .map_err(|e| rpc_err(-32602, format!("invalid bundle content hash: {e}")))?;
        let now = self.state.executor.clock.now();
        self.state.executor.presentations.record_presentation(
            wardrail_core::PresentationId::new(request.presentation_id),
            EnvelopeId::new(request.envelope_id),
            CircleId::new(request.circle_id),
            hash,
            now,
        );
        Ok(())
    }

    async fn get_caps_status(&self, circle_id: String, currency: String) -> RpcResult<Vec<RpcCapsScope>> {
        let currency = Currency::parse(&currency).map_err(|e| rpc_err(-32602, e.to_string()))?;
        let now = self.state.executor.clock.now();
        let day_key = now.date_naive().and_hms_opt(0, 0, 0).expect("midnight always valid").and_utc().timestamp() as u32;
        let policy = CapsPolicy {
            circle_daily_cap_minor: self.state.executor.config.circle_daily_cap_minor,
            intersection_daily_cap_minor: self.state.executor.config.intersection_daily_cap_minor,
            payee_daily_cap_minor: self.state.executor.config.payee_daily_cap_minor,
            max_attempts_per_day_circle: self.state.executor.config.max_attempts_per_day_circle,
            max_attempts_per_day_intersection: self.state.executor.config.max_attempts_per_day_intersection,
        };
        let req = CapsCheckRequest {
            day_key,
            circle_id: &circle_id,
            intersection_id: None,
            payee_id: "",
            currency,
            amount_minor: 0,
        };
        let result = self.state.executor.caps.check(&req, &policy);
        Ok(result.scopes.into_iter().map(RpcCapsScope::from).collect())
    }

    async fn get_providers(&self) -> RpcResult<Vec<RpcProvider>> {
        Ok(self.state.executor.providers.list().into_iter().map(RpcProvider::from).collect())
    }

    async fn get_payees(&self) -> RpcResult<Vec<RpcPayee>> {
        Ok(self.state.executor.payees.list().into_iter().map(RpcPayee::from).collect())
    }

    async fn get_audit_trail(&self, limit: u32) -> RpcResult<Vec<RpcAuditEvent>> {
        let limit = limit.min(500) as usize;
        let mut events = self.state.audit.events();
        if events.len() > limit {
            events = events.split_off(events.len() - limit);
        }
        Ok(events.into_iter().map(RpcAuditEvent::from).collect())
    }

    async fn get_version(&self) -> RpcResult<RpcVersionInfo> {
        Ok(RpcVersionInfo {
            node_version: env!("CARGO_PKG_VERSION").to_string(),
            protocol_version: "1".to_string(),
            api_version: "1".to_string(),
        })
    }
}
