use std::fmt;
use std::io;
use std::path::PathBuf;

use haul_archive::PackError;
use haul_select::SelectionError;
use haul_transfer::{FailureClass, RetryError};
use haul_verify::Checksum;
use serde::Serialize;
use thiserror::Error;

/// Every way an artifact operation can fail.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("file selection failed: {0}")]
    Selection(#[from] SelectionError),

    #[error("packaging failed: {0}")]
    Packaging(#[from] PackError),

    #[error("integrity check failed for {target}: expected {}, got {}", display_opt(.expected), display_opt(.actual))]
    Integrity {
        target:   String,
        expected: Option<Checksum>,
        actual:   Option<Checksum>,
    },

    #[error("an artifact named '{name}' already exists")]
    Conflict { name: String },

    #[error("artifact '{id}' not found")]
    NotFound { id: String },

    #[error("{operation} of {target} failed after {attempts} attempt(s) ({class}{}): {message}", display_status(.status))]
    Transfer {
        operation: &'static str,
        target:    String,
        attempts:  u32,
        status:    Option<u16>,
        class:     FailureClass,
        message:   String,
    },

    #[error("{operation} of {target} cancelled after {attempts} attempt(s)")]
    Cancelled {
        operation: &'static str,
        target:    String,
        attempts:  u32,
    },

    #[error("invalid request: {reason}")]
    InvalidRequest { reason: String },

    #[error("unexpected response during {operation}: {reason}")]
    Protocol { operation: &'static str, reason: String },

    #[error("{operation} failed on '{}': {source}", .path.display())]
    Io {
        operation: &'static str,
        path:      PathBuf,
        source:    io::Error,
    },
}

fn display_opt(value: &Option<Checksum>) -> String {
    value.as_ref().map_or_else(|| "<none>".to_string(), ToString::to_string)
}

fn display_status(status: &Option<u16>) -> String { status.map(|s| format!(", HTTP {s}")).unwrap_or_default() }

pub type Result<T> = std::result::Result<T, ArtifactError>;

/// Discriminant of [`ArtifactError`], for branching and reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Selection,
    Packaging,
    Integrity,
    Conflict,
    NotFound,
    Transfer,
    Cancelled,
    InvalidRequest,
    Protocol,
    Io,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Selection => "selection",
            Self::Packaging => "packaging",
            Self::Integrity => "integrity",
            Self::Conflict => "conflict",
            Self::NotFound => "not_found",
            Self::Transfer => "transfer",
            Self::Cancelled => "cancelled",
            Self::InvalidRequest => "invalid_request",
            Self::Protocol => "protocol",
            Self::Io => "io",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl ArtifactError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Selection(_) => ErrorKind::Selection,
            Self::Packaging(_) => ErrorKind::Packaging,
            Self::Integrity { .. } => ErrorKind::Integrity,
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Transfer { .. } => ErrorKind::Transfer,
            Self::Cancelled { .. } => ErrorKind::Cancelled,
            Self::InvalidRequest { .. } => ErrorKind::InvalidRequest,
            Self::Protocol { .. } => ErrorKind::Protocol,
            Self::Io { .. } => ErrorKind::Io,
        }
    }

    /// Network attempts made before failing. Zero for failures raised before
    /// anything was sent.
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Transfer { attempts, .. } | Self::Cancelled { attempts, .. } => *attempts,
            _ => 0,
        }
    }

    /// Convert the outcome of an exhausted, terminal, timed out or cancelled
    /// retry loop.
    pub fn from_retry(operation: &'static str, target: impl Into<String>, err: RetryError) -> Self {
        let target = target.into();
        match err {
            RetryError::Cancelled { attempts, .. } => Self::Cancelled {
                operation,
                target,
                attempts,
            },
            RetryError::Terminal { attempts, last } | RetryError::Exhausted { attempts, last } => Self::Transfer {
                operation,
                target,
                attempts,
                status: last.status,
                class: last.class,
                message: last.message,
            },
            RetryError::DeadlineExceeded {
                attempts,
                deadline,
                last,
            } => Self::Transfer {
                operation,
                target,
                attempts,
                status: last.status,
                class: last.class,
                message: format!("deadline of {deadline:?} reached: {}", last.message),
            },
        }
    }

    pub(crate) fn io(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn protocol(operation: &'static str, reason: impl Into<String>) -> Self {
        Self::Protocol {
            operation,
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid(reason: impl Into<String>) -> Self { Self::InvalidRequest { reason: reason.into() } }
}
