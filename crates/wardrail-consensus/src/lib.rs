pub mod approver;
pub mod gate;
pub mod neutral_language;
pub mod presentation;
pub mod symmetry;
pub mod threshold;
pub mod used;

pub use approver::ApproverSet;
pub use gate::{check, GateResult};
pub use presentation::PresentationLog;
pub use used::UsedArtifacts;
