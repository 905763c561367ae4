pub mod caps;
pub mod ledger;

pub use caps::{CapsCheckRequest, CapsCheckResult, CapsGate, ScopeCheckResult, ScopeType};
pub use ledger::AttemptLedger;
