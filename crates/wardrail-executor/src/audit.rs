use std::sync::Mutex;
use tracing::{debug, info};
use wardrail_core::AuditEvent;

/// The sink an executor emits audit events to. Implementations must
/// never panic or block indefinitely — a failing emitter must not be
/// able to crash the core, so `emit` has no return value for the
/// executor to propagate.
pub trait AuditSink: Send + Sync {
    fn emit(&self, event: AuditEvent);
}

/// Forwards every event to `tracing` at `info`. Used by `wardrail-node`.
#[derive(Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn emit(&self, event: AuditEvent) {
        info!(
            event_type = %event.event_type,
            envelope_id = event.envelope_id.as_ref().map(|e| e.to_string()),
            attempt_id = event.attempt_id.as_ref().map(|a| a.to_string()),
            detail = %event.detail,
            "audit event"
        );
    }
}

/// Collects events in memory, for tests.
#[derive(Default)]
pub struct CollectingAuditSink {
    events: Mutex<Vec<AuditEvent>>,
}

impl AuditSink for CollectingAuditSink {
    fn emit(&self, event: AuditEvent) {
        debug!(event_type = %event.event_type, "audit event collected");
        self.events.lock().expect("audit sink mutex poisoned").push(event);
    }
}

impl CollectingAuditSink {
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().expect("audit sink mutex poisoned").clone()
    }
}
