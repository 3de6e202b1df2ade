//! SHA-256 digests for records, chains, and state hashes.
//!
//! Digests serialize as hex strings so they read well in JSON exports and
//! storage keys.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest as _, Sha256};
use std::fmt;

use crate::error::{Error, Result};
use crate::utils::constants::DIGEST_LENGTH;

/// A 32-byte SHA-256 digest
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Digest([u8; DIGEST_LENGTH]);

impl Serialize for Digest {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(self.0))
    }
}

impl<'de> Deserialize<'de> for Digest {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(&s).map_err(serde::de::Error::custom)?;
        if bytes.len() != DIGEST_LENGTH {
            return Err(serde::de::Error::custom(format!(
                "expected {} bytes, got {}",
                DIGEST_LENGTH,
                bytes.len()
            )));
        }
        let mut arr = [0u8; DIGEST_LENGTH];
        arr.copy_from_slice(&bytes);
        Ok(Digest(arr))
    }
}

impl Digest {
    /// Create a new digest from bytes
    pub fn new(bytes: [u8; DIGEST_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Create a digest from a slice (must be exactly 32 bytes)
    pub fn from_slice(slice: &[u8]) -> Result<Self> {
        if slice.len() != DIGEST_LENGTH {
            return Err(Error::InvalidParameter {
                name: "digest".into(),
                reason: format!("expected {} bytes, got {}", DIGEST_LENGTH, slice.len()),
            });
        }
        let mut bytes = [0u8; DIGEST_LENGTH];
        bytes.copy_from_slice(slice);
        Ok(Self(bytes))
    }

    /// Compute the SHA-256 digest of data
    pub fn sha256(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        let result = hasher.finalize();
        let mut bytes = [0u8; DIGEST_LENGTH];
        bytes.copy_from_slice(&result);
        Self(bytes)
    }

    /// Chain this digest with new data: `sha256(self || data)`
    pub fn chain(&self, data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(self.0);
        hasher.update(data);
        let result = hasher.finalize();
        let mut bytes = [0u8; DIGEST_LENGTH];
        bytes.copy_from_slice(&result);
        Self(bytes)
    }

    /// Get the digest as bytes
    pub fn as_bytes(&self) -> &[u8; DIGEST_LENGTH] {
        &self.0
    }

    /// Convert to hex string
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Create from hex string
    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = hex::decode(s).map_err(|e| Error::InvalidParameter {
            name: "digest".into(),
            reason: e.to_string(),
        })?;
        Self::from_slice(&bytes)
    }

    /// Zero digest (all zeros)
    pub fn zero() -> Self {
        Self([0u8; DIGEST_LENGTH])
    }

    /// Check if digest is zero
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; DIGEST_LENGTH]
    }
}

impl Default for Digest {
    fn default() -> Self {
        Self::zero()
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl AsRef<[u8]> for Digest {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_deterministic() {
        let a = Digest::sha256(b"hello");
        let b = Digest::sha256(b"hello");
        let c = Digest::sha256(b"world");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(!a.is_zero());
    }

    #[test]
    fn test_hex_round_trip() {
        let digest = Digest::sha256(b"round trip");
        let hex = digest.to_hex();
        assert_eq!(hex.len(), 64);
        assert_eq!(Digest::from_hex(&hex).unwrap(), digest);
    }

    #[test]
    fn test_from_slice_length_check() {
        assert!(Digest::from_slice(&[0u8; 32]).is_ok());
        assert!(Digest::from_slice(&[0u8; 31]).is_err());
        assert!(Digest::from_slice(&[0u8; 33]).is_err());
    }

    #[test]
    fn test_chain_depends_on_order() {
        let base = Digest::sha256(b"base");
        let ab = base.chain(b"a").chain(b"b");
        let ba = base.chain(b"b").chain(b"a");
        assert_ne!(ab, ba);
    }

    #[test]
    fn test_serde_as_hex() {
        let digest = Digest::sha256(b"serde");
        let json = serde_json::to_string(&digest).unwrap();
        assert!(json.contains(&digest.to_hex()));

        let back: Digest = serde_json::from_str(&json).unwrap();
        assert_eq!(back, digest);
    }
}
