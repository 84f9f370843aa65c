//! Error types for haul-transfer.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::core::{classify_status, parse_retry_after};
use crate::data::{FailureClass, Response};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// No response within the configured time.
    Timeout,
    /// The connection could not be established.
    Connect,
    /// The connection broke while sending or receiving.
    Io,
    /// The request could not be built.
    Invalid,
}

/// A request that produced no HTTP response.
#[derive(Debug, Clone, Error)]
#[error("{kind:?}: {message}")]
pub struct TransportError {
    pub kind:    TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self { Self::new(TransportErrorKind::Timeout, message) }

    pub fn connect(message: impl Into<String>) -> Self { Self::new(TransportErrorKind::Connect, message) }

    pub fn io(message: impl Into<String>) -> Self { Self::new(TransportErrorKind::Io, message) }

    pub fn invalid(message: impl Into<String>) -> Self { Self::new(TransportErrorKind::Invalid, message) }

    pub fn class(&self) -> FailureClass {
        match self.kind {
            TransportErrorKind::Timeout => FailureClass::Timeout,
            TransportErrorKind::Connect | TransportErrorKind::Io => FailureClass::Connection,
            TransportErrorKind::Invalid => FailureClass::Validation,
        }
    }
}

/// Why a single attempt failed, classified for the retry loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptError {
    pub class:       FailureClass,
    pub status:      Option<u16>,
    /// Server-requested wait, from `retry-after`.
    pub retry_after: Option<Duration>,
    pub message:     String,
}

impl AttemptError {
    pub fn new(class: FailureClass, message: impl Into<String>) -> Self {
        Self {
            class,
            status: None,
            retry_after: None,
            message: message.into(),
        }
    }

    /// A locally detected problem that no retry can fix.
    pub fn validation(message: impl Into<String>) -> Self { Self::new(FailureClass::Validation, message) }

    pub fn from_transport(err: &TransportError) -> Self { Self::new(err.class(), err.message.clone()) }

    /// Classify an unsuccessful response. `message` is the response body or
    /// a summary of it.
    pub fn from_response(response: &Response, message: impl Into<String>) -> Self {
        let status = response.status();
        let class = classify_status(status, response.headers()).unwrap_or(FailureClass::Validation);
        Self {
            class,
            status: Some(status),
            retry_after: response.header("retry-after").and_then(parse_retry_after),
            message: message.into(),
        }
    }

    pub fn is_retryable(&self) -> bool { self.class.is_retryable() }
}

impl fmt::Display for AttemptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "{} (HTTP {status}): {}", self.class, self.message),
            None => write!(f, "{}: {}", self.class, self.message),
        }
    }
}

impl std::error::Error for AttemptError {}

impl From<TransportError> for AttemptError {
    fn from(err: TransportError) -> Self { Self::from_transport(&err) }
}

/// How a retried operation ended without success.
#[derive(Debug, Clone, Error)]
pub enum RetryError {
    #[error("non-retryable failure after {attempts} attempt(s): {last}")]
    Terminal { attempts: u32, last: AttemptError },

    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: AttemptError },

    #[error("deadline of {deadline:?} reached after {attempts} attempt(s): {last}")]
    DeadlineExceeded {
        attempts: u32,
        deadline: Duration,
        last:     AttemptError,
    },

    #[error("cancelled after {attempts} attempt(s)")]
    Cancelled { attempts: u32, last: Option<AttemptError> },
}

impl RetryError {
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Terminal { attempts, .. }
            | Self::Exhausted { attempts, .. }
            | Self::DeadlineExceeded { attempts, .. }
            | Self::Cancelled { attempts, .. } => *attempts,
        }
    }

    pub fn last(&self) -> Option<&AttemptError> {
        match self {
            Self::Terminal { last, .. } | Self::Exhausted { last, .. } | Self::DeadlineExceeded { last, .. } => {
                Some(last)
            }
            Self::Cancelled { last, .. } => last.as_ref(),
        }
    }

    pub fn is_cancelled(&self) -> bool { matches!(self, Self::Cancelled { .. }) }
}
