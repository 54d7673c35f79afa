//! Content digests of type-map blobs.

use sha2::{Digest, Sha256};

#[cfg(feature = "std")]
use alloc::string::String;

/// SHA-256 over the declared bytes of a blob.
///
/// Two maps with equal digests declare exactly the same types, which is what
/// registries use to refuse duplicate registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlobDigest([u8; 32]);

impl BlobDigest {
    pub fn of(bytes: &[u8]) -> Self {
        let digest = Sha256::digest(bytes);
        let mut out = [0u8; 32];
        out.copy_from_slice(&digest);
        Self(out)
    }

    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Format as hex string.
    #[cfg(feature = "std")]
    pub fn to_hex(&self) -> String {
        use alloc::format;
        self.0.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

impl core::fmt::Display for BlobDigest {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        for b in self.0.iter().take(4) {
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_stable() {
        assert_eq!(BlobDigest::of(b"abc"), BlobDigest::of(b"abc"));
        assert_ne!(BlobDigest::of(b"abc"), BlobDigest::of(b"abd"));
    }

    #[cfg(feature = "std")]
    #[test]
    fn hex_of_empty_input() {
        assert_eq!(
            BlobDigest::of(b"").to_hex(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
