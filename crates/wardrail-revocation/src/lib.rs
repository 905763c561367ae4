//! wardrail-revocation
//!
//! Provider/payee registries, the revocation registry, and the policy /
//! view snapshot verifier. Grouped together because all four are
//! read-mostly, singleton, in-memory stores consulted by the executor at
//! the same points in the pipeline.

pub mod registry;
pub mod revocation;
pub mod snapshot;

pub use registry::{PayeeEntry, PayeeRegistry, ProviderEntry, ProviderEnvironment, ProviderRegistry};
pub use revocation::{apply_to_envelope, RevocationRegistry, RevocationWindow};
pub use snapshot::{current_policy_snapshot, policy_snapshot_hash, verify_policy, verify_view, view_snapshot_hash, ViewProvider};
