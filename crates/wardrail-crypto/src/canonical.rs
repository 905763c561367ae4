use sha2::{Digest, Sha256};

/// Builds a deterministic, canonical byte representation of a record by
/// appending `field=value` pairs in the order they are pushed, separated
/// by `;`. Callers are responsible for pushing fields in a fixed order
/// and sorting any collection before pushing it, so that two equal
/// records always canonicalize to the same bytes regardless of
/// construction order elsewhere in the program.
#[derive(Default)]
pub struct CanonicalWriter {
    buf: String,
}

impl CanonicalWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: &str, value: impl std::fmt::Display) -> Self {
        if !self.buf.is_empty() {
            self.buf.push(';');
        }
        self.buf.push_str(name);
        self.buf.push('=');
        self.buf.push_str(&value.to_string());
        self
    }

    /// Appends a pre-sorted list of values as a single comma-joined field.
    pub fn sorted_list(self, name: &str, mut values: Vec<String>) -> Self {
        values.sort();
        self.field(name, values.join(","))
    }

    pub fn finish(self) -> String {
        self.buf
    }
}

/// SHA-256 of arbitrary bytes, as a raw 32-byte array.
pub fn sha256_bytes(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// SHA-256 of arbitrary bytes, hex-encoded.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(sha256_bytes(data))
}

/// SHA-256 over a canonical string built by a `CanonicalWriter`.
pub fn canonical_hash(canonical: &str) -> [u8; 32] {
    sha256_bytes(canonical.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_writer_is_order_sensitive_but_deterministic() {
        let a = CanonicalWriter::new()
            .field("amount", 100)
            .field("currency", "GBP")
            .finish();
        let b = CanonicalWriter::new()
            .field("amount", 100)
            .field("currency", "GBP")
            .finish();
        assert_eq!(a, b);
        assert_eq!(canonical_hash(&a), canonical_hash(&b));
    }

    #[test]
    fn sorted_list_ignores_input_order() {
        let a = CanonicalWriter::new()
            .sorted_list("providers", vec!["b".into(), "a".into()])
            .finish();
        let b = CanonicalWriter::new()
            .sorted_list("providers", vec!["a".into(), "b".into()])
            .finish();
        assert_eq!(a, b);
    }
}
