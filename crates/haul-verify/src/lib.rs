//! Content checksums for transferred artifacts.
//!
//! Digests are computed incrementally over fixed-size chunks so memory use
//! stays bounded by the chunk size regardless of artifact size. Every digest
//! carries the tag of the algorithm that produced it (`sha256:<hex>`), which
//! keeps previously stored digests verifiable if the default algorithm ever
//! changes.
//!
//! # Example
//!
//! ```
//! use haul_verify::ChecksumEngine;
//!
//! let engine = ChecksumEngine::default();
//! let digest = engine.digest(&b"hello world"[..]).unwrap();
//!
//! assert_eq!(
//!     digest.to_string(),
//!     "sha256:b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
//! );
//! assert!(engine.verify(&b"hello world"[..], &digest).unwrap());
//! ```

pub use self::checksum::{Checksum, ChecksumAlgorithm};
pub use self::engine::{ChecksumEngine, DEFAULT_CHUNK_SIZE};
pub use self::error::{Result, VerificationError};
pub use self::hasher::{Hasher, Sha256Hasher};
pub use self::reader::VerifiedReader;

mod checksum;
mod engine;
mod error;
mod hasher;
mod reader;
