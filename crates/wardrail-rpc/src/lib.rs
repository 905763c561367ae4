//! wardrail-rpc
//!
//! JSON-RPC 2.0 server fronting one `wardrail-executor` instance.
//!
//! Namespace: "wardrail"
//! Methods:
//!   wardrail_execute         — run the pipeline for a sealed envelope + approval bundle
//!   wardrail_getAttempt      — look up an attempt by id
//!   wardrail_revoke          — raise a revocation signal against an envelope
//!   wardrail_presentBundle   — record a circle's presentation of an approval bundle
//!   wardrail_getCapsStatus   — read-only caps/rate-limit status for a circle
//!   wardrail_getProviders    — list registered providers
//!   wardrail_getPayees       — list registered payees
//!   wardrail_getAuditTrail   — recent audit events
//!   wardrail_getVersion      — node/protocol version info

pub mod api;
pub mod server;
pub mod types;

pub use api::WardrailApiServer;
pub use server::{RpcServer, RpcServerState};
pub use types::{
    RpcAttempt, RpcAuditEvent, RpcCapsScope, RpcExecResult, RpcExecuteRequest, RpcPayee,
    RpcPresentationRequest, RpcProvider, RpcRevocationRequest, RpcRevocationSignal, RpcVersionInfo,
};
