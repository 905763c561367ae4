pub mod canonical;
pub mod idempotency;

pub use canonical::{canonical_hash, sha256_bytes, sha256_hex, CanonicalWriter};
pub use idempotency::{
    derive_idempotency_key, derive_idempotency_key_hex, provider_form, safe_prefix,
    validate_hex64, IdempotencyError,
};
