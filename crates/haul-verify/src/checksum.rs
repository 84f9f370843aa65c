use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Result, VerificationError};
use crate::hasher::{Hasher, Sha256Hasher};

/// Digest algorithms understood by the engine.
///
/// The tag of an algorithm is part of every stored digest and must never
/// change once released.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum ChecksumAlgorithm {
    #[default]
    Sha256,
}

impl ChecksumAlgorithm {
    pub fn tag(self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
        }
    }

    /// Length of a raw digest in bytes.
    pub fn digest_len(self) -> usize {
        match self {
            Self::Sha256 => 32,
        }
    }

    pub fn from_tag(tag: &str) -> Result<Self> {
        match tag.to_ascii_lowercase().as_str() {
            "sha256" | "sha-256" => Ok(Self::Sha256),
            other => Err(VerificationError::UnknownAlgorithm(other.to_string())),
        }
    }

    /// A fresh incremental hasher for this algorithm.
    pub fn hasher(self) -> Sha256Hasher {
        match self {
            Self::Sha256 => Sha256Hasher::new(),
        }
    }

    /// One-shot digest of an in-memory buffer.
    pub fn digest(self, data: &[u8]) -> Checksum {
        let mut hasher = self.hasher();
        hasher.update(data);
        Checksum::new(self, hasher.finalize())
    }
}

impl fmt::Display for ChecksumAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.tag()) }
}

/// A digest together with the algorithm that produced it.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Checksum {
    algorithm: ChecksumAlgorithm,
    digest:    Vec<u8>,
}

impl Checksum {
    pub fn new(algorithm: ChecksumAlgorithm, digest: Vec<u8>) -> Self { Self { algorithm, digest } }

    pub fn algorithm(&self) -> ChecksumAlgorithm { self.algorithm }

    pub fn as_bytes(&self) -> &[u8] { &self.digest }

    pub fn to_hex(&self) -> String { hex::encode(&self.digest) }

    /// Compare against `expected`, failing on mismatch.
    pub fn ensure_matches(&self, expected: &Checksum) -> Result<()> {
        if self.algorithm != expected.algorithm {
            return Err(VerificationError::AlgorithmMismatch {
                expected: expected.algorithm.tag(),
                actual:   self.algorithm.tag(),
            });
        }
        if self.digest != expected.digest {
            return Err(VerificationError::Mismatch {
                expected: expected.clone(),
                actual:   self.clone(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm.tag(), self.to_hex())
    }
}

impl fmt::Debug for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "Checksum({self})") }
}

impl FromStr for Checksum {
    type Err = VerificationError;

    /// Accepts `<tag>:<hex>` or, for digests recorded before tagging, bare
    /// sha256 hex.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let (algorithm, hex_digest) = match s.split_once(':') {
            Some((tag, rest)) => (ChecksumAlgorithm::from_tag(tag)?, rest),
            None => (ChecksumAlgorithm::Sha256, s),
        };

        let digest =
            hex::decode(hex_digest).map_err(|_| VerificationError::MalformedDigest(s.to_string()))?;
        if digest.len() != algorithm.digest_len() {
            return Err(VerificationError::MalformedDigest(s.to_string()));
        }
        Ok(Self { algorithm, digest })
    }
}

impl Serialize for Checksum {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Checksum {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
