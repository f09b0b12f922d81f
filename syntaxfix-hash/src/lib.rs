//! Hashing helpers shared by the pass runner, the write gate and the report.

use sha2::{Digest, Sha256};

/// A sha256 digest of some content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    pub fn of(bytes: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        let mut out = [0u8; 32];
        out.copy_from_slice(&hasher.finalize());
        Self(out)
    }

    pub fn of_str(text: &str) -> Self {
        Self::of(text.as_bytes())
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// First 12 hex characters; enough to tell passes apart in logs.
    pub fn short(&self) -> String {
        let mut s = self.to_hex();
        s.truncate(12);
        s
    }
}

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    ContentHash::of(bytes).to_hex()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_of_empty_input_is_the_known_constant() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn hashes_are_deterministic_and_content_sensitive() {
        assert_eq!(ContentHash::of_str("a: any[];"), ContentHash::of_str("a: any[];"));
        assert_ne!(ContentHash::of_str("a[];"), ContentHash::of_str("a: any[];"));
    }

    #[test]
    fn short_form_is_a_prefix_of_hex() {
        let h = ContentHash::of_str("tags: string[];");
        assert_eq!(h.short().len(), 12);
        assert!(h.to_hex().starts_with(&h.short()));
        assert_eq!(h.to_string(), h.to_hex());
    }
}
