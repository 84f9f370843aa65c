use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::{Checksum, ChecksumAlgorithm, Result, VerifiedReader};

/// Default read size used when streaming input through the hasher.
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Computes and checks digests over byte streams.
///
/// Input is consumed in `chunk_size` pieces; the engine never buffers a whole
/// stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChecksumEngine {
    algorithm:  ChecksumAlgorithm,
    chunk_size: usize,
}

impl Default for ChecksumEngine {
    fn default() -> Self { Self::new(ChecksumAlgorithm::default()) }
}

impl ChecksumEngine {
    pub fn new(algorithm: ChecksumAlgorithm) -> Self {
        Self {
            algorithm,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Set the read size. Zero is clamped to one byte.
    #[must_use]
    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn algorithm(&self) -> ChecksumAlgorithm { self.algorithm }

    pub fn digest<R: Read>(&self, reader: R) -> Result<Checksum> {
        self.digest_with(self.algorithm, reader)
    }

    pub fn digest_file(&self, path: impl AsRef<Path>) -> Result<Checksum> {
        self.digest(File::open(path)?)
    }

    /// Best-effort check: `Ok(false)` on mismatch.
    ///
    /// The digest is recomputed with the algorithm `expected` was produced
    /// with, so digests stored under an older default remain checkable.
    pub fn verify<R: Read>(&self, reader: R, expected: &Checksum) -> Result<bool> {
        let actual = self.digest_with(expected.algorithm(), reader)?;
        Ok(actual == *expected)
    }

    /// Strict check: fails with [`crate::VerificationError::Mismatch`].
    pub fn verify_strict<R: Read>(&self, reader: R, expected: &Checksum) -> Result<()> {
        self.digest_with(expected.algorithm(), reader)?
            .ensure_matches(expected)
    }

    fn digest_with<R: Read>(&self, algorithm: ChecksumAlgorithm, reader: R) -> Result<Checksum> {
        let mut verified = VerifiedReader::new(reader, algorithm.hasher());
        let mut buf = vec![0u8; self.chunk_size];
        loop {
            match verified.read(&mut buf) {
                Ok(0) => break,
                Ok(_) => {}
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(verified.into_checksum(algorithm))
    }
}
