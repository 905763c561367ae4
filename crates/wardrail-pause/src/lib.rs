//! wardrail-pause
//!
//! The forced-pause polling plan and read-only query helpers over the
//! attempt ledger. The pause itself is awaited by `wardrail-executor`;
//! this crate only computes the poll schedule and describes state.

pub mod query;
pub mod schedule;

pub use query::AttemptQuery;
pub use schedule::{poll_plan, PauseOutcome};
