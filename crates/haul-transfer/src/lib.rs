//! HTTP transport and retry policy for artifact transfers.
//!
//! # Architecture
//!
//! - [`data`] - requests, responses and retry configuration
//! - [`core`] - pure backoff and failure classification
//! - [`effects`] - the [`HttpClient`] seam, clocks and the retry loop
//!
//! Every network call of an artifact operation goes through
//! [`RetryPolicy::execute`], which classifies each failure, backs off
//! exponentially between retryable ones and stops on the first terminal one,
//! on exhaustion, on the deadline or on cancellation.

pub mod core;
pub mod data;
pub mod effects;
mod error;

pub use crate::core::{classify_status, parse_retry_after, retry_delay};
pub use data::{Body, FailureClass, Headers, Method, Request, Response, RetryConfig};
pub use effects::{BoxStream, Clock, HttpClient, Retried, RetryPolicy, TokioClock};

#[cfg(feature = "reqwest")]
pub use effects::{ReqwestClient, ReqwestClientBuilder};

pub use error::{AttemptError, RetryError, TransportError, TransportErrorKind};

pub use tokio_util::sync::CancellationToken;
