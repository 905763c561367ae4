use serde::{Deserialize, Serialize};
use wardrail_core::{ApprovalBundle, AttemptRecord, ExecutionEnvelope, RevocationSignal};
use wardrail_executor::ExecResult;
use wardrail_revocation::{PayeeEntry, ProviderEntry};
use wardrail_state::ScopeCheckResult;

/// Parameters for `wardrail_execute`: a sealed envelope, the attempt
/// identity the caller wants this run recorded under, and the approval
/// bundle presented alongside it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcExecuteRequest {
    pub envelope: ExecutionEnvelope,
    pub attempt_id: String,
    pub trace_id: String,
    pub bundle: ApprovalBundle,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcExecResult {
    pub status: String,
    pub provider_reference: Option<String>,
    pub reason: Option<String>,
}

impl From<ExecResult> for RpcExecResult {
    fn from(r: ExecResult) -> Self {
        match r {
            ExecResult::Settled { provider_reference } => Self {
                status: "Settled".into(),
                provider_reference: Some(provider_reference),
                reason: None,
            },
            ExecResult::Simulated { provider_reference } => Self {
                status: "Simulated".into(),
                provider_reference: Some(provider_reference),
                reason: None,
            },
            ExecResult::Blocked { reason } => Self {
                status: "Blocked".into(),
                provider_reference: None,
                reason: Some(reason),
            },
            ExecResult::Aborted => Self {
                status: "Aborted".into(),
                provider_reference: None,
                reason: None,
            },
            ExecResult::Revoked { reason } => Self {
                status: "Revoked".into(),
                provider_reference: None,
                reason: Some(reason),
            },
            ExecResult::Expired => Self {
                status: "Expired".into(),
                provider_reference: None,
                reason: None,
            },
            ExecResult::Failed { reason } => Self {
                status: "Failed".into(),
                provider_reference: None,
                reason: Some(reason),
            },
        }
    }
}

/// JSON-serializable view of an `AttemptRecord`, returned by
/// `wardrail_getAttempt`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcAttempt {
    pub attempt_id: String,
    pub envelope_id: String,
    pub status: String,
    pub provider_id: String,
    pub provider_reference: Option<String>,
    pub started_at: String,
    pub updated_at: String,
    pub trace_id: String,
}

impl From<AttemptRecord> for RpcAttempt {
    fn from(a: AttemptRecord) -> Self {
        Self {
            attempt_id: a.attempt_id.to_string(),
            envelope_id: a.envelope_id.to_string(),
            status: format!("{:?}", a.status),
            provider_id: a.provider_id.to_string(),
            provider_reference: a.provider_reference,
            started_at: a.started_at.to_rfc3339(),
            updated_at: a.updated_at.to_rfc3339(),
            trace_id: a.trace_id.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcCapsScope {
    pub scope: String,
    pub scope_id: String,
    pub current: u64,
    pub limit: u64,
    pub requested: u64,
    pub allowed: bool,
    pub reason: Option<String>,
}

impl From<ScopeCheckResult> for RpcCapsScope {
    fn from(s: ScopeCheckResult) -> Self {
        Self {
            scope: s.scope,
            scope_id: s.scope_id,
            current: s.current,
            limit: s.limit,
            requested: s.requested,
            allowed: s.allowed,
            reason: s.reason,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcProvider {
    pub provider_id: String,
    pub environment: String,
    pub allowed: bool,
}

impl From<ProviderEntry> for RpcProvider {
    fn from(p: ProviderEntry) -> Self {
        Self {
            provider_id: p.id.to_string(),
            environment: format!("{:?}", p.environment),
            allowed: p.allowed,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcPayee {
    pub payee_id: String,
    pub provider_id: String,
    pub allowed: bool,
}

impl From<PayeeEntry> for RpcPayee {
    fn from(p: PayeeEntry) -> Self {
        Self {
            payee_id: p.payee_id.to_string(),
            provider_id: p.provider_id.to_string(),
            allowed: p.allowed,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcRevocationRequest {
    pub envelope_id: String,
    pub by_circle: Option<String>,
    pub by_person: Option<String>,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcRevocationSignal {
    pub envelope_id: String,
    pub by_circle: Option<String>,
    pub by_person: Option<String>,
    pub reason: String,
    pub signalled_at: String,
}

impl From<RevocationSignal> for RpcRevocationSignal {
    fn from(s: RevocationSignal) -> Self {
        Self {
            envelope_id: s.envelope_id.to_string(),
            by_circle: s.by_circle.map(|c| c.to_string()),
            by_person: s.by_person.map(|p| p.to_string()),
            reason: s.reason,
            signalled_at: s.signalled_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcAuditEvent {
    pub event_type: String,
    pub envelope_id: Option<String>,
    pub attempt_id: Option<String>,
    pub at: String,
    pub detail: serde_json::Value,
}

impl From<wardrail_core::AuditEvent> for RpcAuditEvent {
    fn from(e: wardrail_core::AuditEvent) -> Self {
        Self {
            event_type: e.event_type,
            envelope_id: e.envelope_id.map(|i| i.to_string()),
            attempt_id: e.attempt_id.map(|i| i.to_string()),
            at: e.at.to_rfc3339(),
            detail: e.detail,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcPresentationRequest {
    pub presentation_id: String,
    pub envelope_id: String,
    pub circle_id: String,
    pub bundle_content_hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcVersionInfo {
    pub node_version: String,
    pub protocol_version: String,
    pub api_version: String,
}
