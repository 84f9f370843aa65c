use std::path::PathBuf;

use haul_archive::PackageFormat;
use haul_verify::Checksum;
use serde::Serialize;

use super::ArtifactDescriptor;
use crate::error::{ArtifactError, ErrorKind};

/// What a successful operation produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransferOutcome {
    Uploaded {
        artifact: ArtifactDescriptor,
        files:    usize,
    },
    Downloaded {
        path:   PathBuf,
        bytes:  u64,
        format: PackageFormat,
        /// Files written when the content was unpacked.
        #[serde(skip_serializing_if = "Option::is_none")]
        extracted_files: Option<usize>,
    },
    Deleted {
        id:      String,
        /// `false` when the artifact was already gone.
        existed: bool,
    },
}

/// The single record of one logical operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferResult {
    pub success:  bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome:  Option<TransferOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checksum: Option<Checksum>,
    pub attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error:    Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message:  Option<String>,
}

impl TransferResult {
    pub fn succeeded(outcome: TransferOutcome, checksum: Option<Checksum>, attempts: u32) -> Self {
        Self {
            success: true,
            outcome: Some(outcome),
            checksum,
            attempts,
            error: None,
            message: None,
        }
    }

    /// Failure record for `err`.
    pub fn failed(err: &ArtifactError) -> Self {
        let checksum = match err {
            ArtifactError::Integrity { actual, .. } => actual.clone(),
            _ => None,
        };
        Self {
            success: false,
            outcome: None,
            checksum,
            attempts: err.attempts(),
            error: Some(err.kind()),
            message: Some(err.to_string()),
        }
    }

    pub fn uploaded(&self) -> Option<&ArtifactDescriptor> {
        match &self.outcome {
            Some(TransferOutcome::Uploaded { artifact, .. }) => Some(artifact),
            _ => None,
        }
    }

    pub fn downloaded_path(&self) -> Option<&PathBuf> {
        match &self.outcome {
            Some(TransferOutcome::Downloaded { path, .. }) => Some(path),
            _ => None,
        }
    }
}
