use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};
use thiserror::Error;

use std::fmt;
use std::str::FromStr;

/// Errors that can occur while parsing digests and difficulty targets
#[derive(Debug, Error)]
pub enum HashError {
    #[error("Invalid hex encoding: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    #[error("Invalid length: expected {expected} hex characters, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}

/// A SHA-256 digest, rendered as 64 lowercase hex characters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Digest([u8; 32]);

impl Digest {
    /// Parses a digest from its 64-hex-character rendering
    pub fn from_hex(s: &str) -> Result<Self, HashError> {
        let mut bytes = [0u8; 32];
        decode_fixed_hex(s, &mut bytes)?;
        Ok(Digest(bytes))
    }

    /// Gets the raw digest bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Renders the digest as a hex string
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Checks whether the digest satisfies a difficulty target
    ///
    /// Both sides are 32-byte big-endian unsigned integers, so byte-array
    /// ordering is numeric ordering at equal width. The digest satisfies the
    /// target when it is numerically less than or equal to it.
    pub fn meets_target(&self, target: &DifficultyTarget) -> bool {
        self.0 <= target.0
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// A difficulty target: the largest acceptable block digest
///
/// Parsed strictly from 64 hex characters so the full 32-byte width is always
/// explicit; leading zeros are significant and survive a round-trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DifficultyTarget([u8; 32]);

impl DifficultyTarget {
    /// Parses a target from its 64-hex-character rendering
    pub fn from_hex(s: &str) -> Result<Self, HashError> {
        let mut bytes = [0u8; 32];
        decode_fixed_hex(s, &mut bytes)?;
        Ok(DifficultyTarget(bytes))
    }

    /// Gets the raw target bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Renders the target as a fixed-width hex string
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for DifficultyTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl FromStr for DifficultyTarget {
    type Err = HashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DifficultyTarget::from_hex(s)
    }
}

impl Serialize for DifficultyTarget {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for DifficultyTarget {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        DifficultyTarget::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Computes the SHA-256 digest of a canonical byte encoding
pub fn digest(bytes: &[u8]) -> Digest {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    Digest(hasher.finalize().into())
}

fn decode_fixed_hex(s: &str, out: &mut [u8; 32]) -> Result<(), HashError> {
    if s.len() != 64 {
        return Err(HashError::InvalidLength {
            expected: 64,
            actual: s.len(),
        });
    }

    hex::decode_to_slice(s, out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_is_deterministic() {
        let a = digest(b"some block bytes");
        let b = digest(b"some block bytes");
        let c = digest(b"other block bytes");

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_digest_hex_roundtrip() {
        let d = digest(b"hello");
        let rendered = d.to_hex();

        assert_eq!(rendered.len(), 64);
        assert_eq!(Digest::from_hex(&rendered).unwrap(), d);
    }

    #[test]
    fn test_target_width_is_strict() {
        // 63 and 65 characters are rejected even when the hex itself is valid
        assert!(DifficultyTarget::from_hex(&"f".repeat(63)).is_err());
        assert!(DifficultyTarget::from_hex(&"f".repeat(65)).is_err());
        assert!(DifficultyTarget::from_hex(&"g".repeat(64)).is_err());
        assert!(DifficultyTarget::from_hex(&"f".repeat(64)).is_ok());
    }

    #[test]
    fn test_target_preserves_leading_zeros() {
        let rendered = format!("00{}", "ff".repeat(31));
        let target = DifficultyTarget::from_hex(&rendered).unwrap();

        assert_eq!(target.to_hex(), rendered);
    }

    #[test]
    fn test_comparison_is_numeric_not_prefix() {
        // Target 0x0fff...ff: a prefix check on "0" would accept 0x10...,
        // the numeric comparison must reject it.
        let target = DifficultyTarget::from_hex(&format!("0f{}", "ff".repeat(31))).unwrap();

        let above = Digest::from_hex(&format!("10{}", "00".repeat(31))).unwrap();
        let below = Digest::from_hex(&format!("0e{}", "ff".repeat(31))).unwrap();
        let equal = Digest::from_hex(&format!("0f{}", "ff".repeat(31))).unwrap();

        assert!(!above.meets_target(&target));
        assert!(below.meets_target(&target));
        assert!(equal.meets_target(&target));
    }

    #[test]
    fn test_comparison_spans_full_width() {
        // Identical first bytes: the decision falls to the last byte.
        let target = DifficultyTarget::from_hex(&format!("{}07", "ab".repeat(31))).unwrap();

        let above = Digest::from_hex(&format!("{}08", "ab".repeat(31))).unwrap();
        let below = Digest::from_hex(&format!("{}06", "ab".repeat(31))).unwrap();

        assert!(!above.meets_target(&target));
        assert!(below.meets_target(&target));
    }
}
