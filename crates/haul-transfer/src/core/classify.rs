use std::time::Duration;

use crate::data::{FailureClass, Headers};

/// Classify an HTTP status. `None` for success and redirects.
///
/// A 403 counts as rate limiting when the server says so through
/// `x-ratelimit-remaining: 0` or a `retry-after` header.
pub fn classify_status(status: u16, headers: &Headers) -> Option<FailureClass> {
    match status {
        100..=399 => None,
        408 => Some(FailureClass::Timeout),
        429 => Some(FailureClass::RateLimited),
        403 if is_rate_limit_signal(headers) => Some(FailureClass::RateLimited),
        400..=499 => Some(FailureClass::Client),
        500..=599 => Some(FailureClass::Server),
        _ => Some(FailureClass::Validation),
    }
}

fn is_rate_limit_signal(headers: &Headers) -> bool {
    headers.get("x-ratelimit-remaining").is_some_and(|v| v.trim() == "0") || headers.get("retry-after").is_some()
}

/// Parse a `retry-after` value given in whole seconds.
///
/// HTTP-date values are not interpreted and yield `None`.
pub fn parse_retry_after(value: &str) -> Option<Duration> { value.trim().parse::<u64>().ok().map(Duration::from_secs) }
