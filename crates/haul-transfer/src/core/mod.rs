//! Pure transformations: backoff arithmetic and failure classification.

mod classify;
mod retry;

pub use classify::{classify_status, parse_retry_after};
pub use retry::retry_delay;
