use chrono::{DateTime, Utc};
use wardrail_core::{AttemptId, AttemptRecord, AttemptStatus};
use wardrail_state::AttemptLedger;

/// Read-only describe/status helpers over the attempt ledger, used by
/// the RPC layer and by tests. Never mutates the ledger.
pub struct AttemptQuery<'a> {
    ledger: &'a AttemptLedger,
}

impl<'a> AttemptQuery<'a> {
    pub fn new(ledger: &'a AttemptLedger) -> Self {
        Self { ledger }
    }

    pub fn get(&self, id: &AttemptId) -> Option<AttemptRecord> {
        self.ledger.get(id)
    }

    pub fn describe(&self, id: &AttemptId, now: DateTime<Utc>) -> String {
        match self.ledger.get(id) {
            None => format!("attempt {id} not found"),
            Some(rec) => {
                let age = now.signed_duration_since(rec.started_at);
                let status_str = match rec.status {
                    AttemptStatus::Started => "started".to_string(),
                    AttemptStatus::Prepared => "prepared".to_string(),
                    AttemptStatus::Invoked => "invoked, awaiting provider".to_string(),
                    AttemptStatus::Settled => format!(
                        "settled (ref: {})",
                        rec.provider_reference.clone().unwrap_or_default()
                    ),
                    AttemptStatus::Simulated => "simulated, no money moved".to_string(),
                    AttemptStatus::Blocked => "blocked by a gate".to_string(),
                    AttemptStatus::Aborted => "aborted".to_string(),
                    AttemptStatus::Revoked => "revoked".to_string(),
                    AttemptStatus::Expired => "expired".to_string(),
                    AttemptStatus::Failed => "failed".to_string(),
                };
                format!(
                    "attempt {} | envelope {} | {} | age {}s",
                    id,
                    rec.envelope_id,
                    status_str,
                    age.num_seconds()
                )
            }
        }
    }
}
