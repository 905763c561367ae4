//! wardrail-executor
//!
//! The orchestrator that threads a sealed envelope through every gate
//! and registry the other crates provide, plus the audit event sink
//! those gates report through. No other crate in the workspace depends
//! on this one; it is the top of the dependency graph.

pub mod audit;
pub mod config;
pub mod executor;

pub use audit::{AuditSink, CollectingAuditSink, TracingAuditSink};
pub use config::Config;
pub use executor::{ExecRequest, ExecResult, Executor};
