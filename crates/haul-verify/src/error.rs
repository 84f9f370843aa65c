use std::io;

use crate::Checksum;

#[derive(Debug, thiserror::Error)]
pub enum VerificationError {
    #[error("checksum mismatch: expected {expected}, got {actual}")]
    Mismatch { expected: Checksum, actual: Checksum },

    #[error("cannot compare {expected} digest against {actual} digest")]
    AlgorithmMismatch {
        expected: &'static str,
        actual:   &'static str,
    },

    #[error("unknown checksum algorithm '{0}'")]
    UnknownAlgorithm(String),

    #[error("malformed digest '{0}'")]
    MalformedDigest(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, VerificationError>;
