//! Plain data: requests, responses and retry configuration.

mod http;
mod retry;

pub use http::{Body, Headers, Method, Request, Response};
pub use retry::{FailureClass, RetryConfig};
