//! Content fingerprints for change detection
//!
//! Same catalog text = same fingerprint. Used only to decide whether a static
//! render is still current, never for anything security-relevant.

use sha2::{Digest, Sha256};

/// Length of a fingerprint in hex characters
pub const FINGERPRINT_LEN: usize = 64;

/// Hash serialized text with SHA256, returning the full lowercase hex digest
pub fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_deterministic() {
        let first = content_hash(r#"{"a":1}"#);
        let second = content_hash(r#"{"a":1}"#);

        assert_eq!(first, second);
        assert_eq!(first.len(), FINGERPRINT_LEN);
    }

    #[test]
    fn hash_different_content() {
        assert_ne!(content_hash(r#"{"a":1}"#), content_hash(r#"{"a":2}"#));
    }

    #[test]
    fn hash_empty_input() {
        assert_eq!(
            content_hash(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
