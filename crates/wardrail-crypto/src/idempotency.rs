use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Fixed, non-secret domain-separation tag. Prevents this derivation from
/// colliding with an unrelated HMAC use of the same four inputs
/// elsewhere in the system; it is not a shared secret and carries no
/// authentication value on its own.
const DOMAIN: &[u8] = b"wardrail.idempotency.v1";

#[derive(Debug, Error)]
pub enum IdempotencyError {
    #[error("idempotency key must be exactly 64 hex characters, got {0}")]
    WrongLength(usize),

    #[error("idempotency key is not valid hex: {0}")]
    NotHex(#[from] hex::FromHexError),
}

/// Derives the idempotency key bound to one attempt: HMAC-SHA-256 keyed
/// with `DOMAIN`, over the ordered, labelled concatenation of the
/// envelope id, action hash, attempt id, and seal hash. Any change to any
/// one of the four inputs changes the key.
pub fn derive_idempotency_key(
    envelope_id: &str,
    action_hash: &str,
    attempt_id: &str,
    seal_hash: &str,
) -> [u8; 32] {
    let mut mac = HmacSha256::new_from_slice(DOMAIN).expect("HMAC accepts any key length");
    mac.update(b"envelope_id=");
    mac.update(envelope_id.as_bytes());
    mac.update(b";action_hash=");
    mac.update(action_hash.as_bytes());
    mac.update(b";attempt_id=");
    mac.update(attempt_id.as_bytes());
    mac.update(b";seal_hash=");
    mac.update(seal_hash.as_bytes());
    mac.finalize().into_bytes().into()
}

pub fn derive_idempotency_key_hex(
    envelope_id: &str,
    action_hash: &str,
    attempt_id: &str,
    seal_hash: &str,
) -> String {
    hex::encode(derive_idempotency_key(
        envelope_id,
        action_hash,
        attempt_id,
        seal_hash,
    ))
}

/// First 16 hex characters, suitable for logs: enough to disambiguate in
/// practice without handing a log reader the full key.
pub fn safe_prefix(key_hex: &str) -> String {
    format!("{}…", &key_hex[..key_hex.len().min(16)])
}

/// First 32 hex characters, the form passed to providers that require a
/// shorter idempotency header than a full 64-char SHA-256 hex digest.
pub fn provider_form(key_hex: &str) -> String {
    key_hex[..key_hex.len().min(32)].to_string()
}

pub fn validate_hex64(s: &str) -> Result<(), IdempotencyError> {
    if s.len() != 64 {
        return Err(IdempotencyError::WrongLength(s.len()));
    }
    hex::decode(s)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derivation_is_deterministic() {
        let a = derive_idempotency_key_hex("env1", "act1", "att1", "seal1");
        let b = derive_idempotency_key_hex("env1", "act1", "att1", "seal1");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn any_changed_input_changes_the_key() {
        let base = derive_idempotency_key_hex("env1", "act1", "att1", "seal1");
        assert_ne!(base, derive_idempotency_key_hex("env2", "act1", "att1", "seal1"));
        assert_ne!(base, derive_idempotency_key_hex("env1", "act2", "att1", "seal1"));
        assert_ne!(base, derive_idempotency_key_hex("env1", "act1", "att2", "seal1"));
        assert_ne!(base, derive_idempotency_key_hex("env1", "act1", "att1", "seal2"));
    }

    #[test]
    fn validate_hex64_rejects_wrong_length_and_bad_hex() {
        assert!(validate_hex64(&"a".repeat(64)).is_ok());
        assert!(validate_hex64(&"a".repeat(63)).is_err());
        assert!(validate_hex64(&"z".repeat(64)).is_err());
    }
}
