use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::clock::{Clock, TokioClock};
use crate::core::retry_delay;
use crate::data::RetryConfig;
use crate::error::{AttemptError, RetryError};

/// A successful result, the number of attempts it took and the time spent
/// waiting between them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Retried<T> {
    pub value:       T,
    pub attempts:    u32,
    pub total_delay: Duration,
}

/// Per-call bookkeeping, owned by one [`RetryPolicy::execute`] invocation.
#[derive(Debug)]
struct RetryState {
    attempt:     u32,
    total_delay: Duration,
    last:        Option<AttemptError>,
    started:     Instant,
}

impl RetryState {
    fn new(started: Instant) -> Self {
        Self {
            attempt: 0,
            total_delay: Duration::ZERO,
            last: None,
            started,
        }
    }

    fn cancelled(self) -> RetryError {
        RetryError::Cancelled {
            attempts: self.attempt,
            last:     self.last,
        }
    }
}

/// Runs an operation until it succeeds, fails terminally, runs out of
/// attempts or time, or is cancelled.
#[derive(Debug, Clone, Default)]
pub struct RetryPolicy<K = TokioClock> {
    config: RetryConfig,
    clock:  K,
}

impl RetryPolicy<TokioClock> {
    pub fn new(config: RetryConfig) -> Self { Self::with_clock(config, TokioClock) }
}

impl<K: Clock> RetryPolicy<K> {
    pub fn with_clock(config: RetryConfig, clock: K) -> Self {
        let config = RetryConfig {
            max_attempts: config.max_attempts.max(1),
            ..config
        };
        Self { config, clock }
    }

    pub fn config(&self) -> &RetryConfig { &self.config }

    pub fn clock(&self) -> &K { &self.clock }

    /// Wait before the next attempt after `failed` was attempt number `attempt`.
    ///
    /// A server-supplied `retry-after` replaces the computed backoff. Both are
    /// capped at `max_delay`.
    pub fn delay_for(&self, attempt: u32, failed: &AttemptError) -> Duration {
        match failed.retry_after {
            Some(wait) => wait.min(self.config.max_delay),
            None => retry_delay(attempt, self.config.base_delay, self.config.max_delay),
        }
    }

    /// Drive `attempt_fn` (called with the 1-based attempt number) to a
    /// result.
    ///
    /// Cancellation is checked before each attempt and interrupts the wait
    /// between attempts. An attempt already in flight runs to completion.
    pub async fn execute<T, F, Fut>(
        &self,
        operation: &str,
        cancel: &CancellationToken,
        mut attempt_fn: F,
    ) -> Result<Retried<T>, RetryError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, AttemptError>>,
    {
        let mut state = RetryState::new(self.clock.now());

        loop {
            if cancel.is_cancelled() {
                info!(operation, attempts = state.attempt, "cancelled before attempt");
                return Err(state.cancelled());
            }
            state.attempt += 1;
            let attempt = state.attempt;
            debug!(operation, attempt, "starting attempt");

            let failed = match attempt_fn(attempt).await {
                Ok(value) => {
                    if attempt > 1 {
                        info!(operation, attempts = attempt, "succeeded after retrying");
                    }
                    return Ok(Retried {
                        value,
                        attempts: attempt,
                        total_delay: state.total_delay,
                    });
                }
                Err(failed) => failed,
            };

            if !failed.is_retryable() {
                debug!(operation, attempt, class = %failed.class, "non-retryable failure");
                return Err(RetryError::Terminal {
                    attempts: attempt,
                    last:     failed,
                });
            }
            if attempt >= self.config.max_attempts {
                warn!(operation, attempts = attempt, error = %failed, "retry attempts exhausted");
                return Err(RetryError::Exhausted {
                    attempts: attempt,
                    last:     failed,
                });
            }

            let delay = self.delay_for(attempt, &failed);
            if let Some(deadline) = self.config.deadline {
                let elapsed = self.clock.now().saturating_duration_since(state.started);
                if elapsed.saturating_add(delay) > deadline {
                    warn!(operation, attempts = attempt, ?deadline, error = %failed, "retry deadline reached");
                    return Err(RetryError::DeadlineExceeded {
                        attempts: attempt,
                        deadline,
                        last: failed,
                    });
                }
            }

            warn!(
                operation,
                attempt,
                max_attempts = self.config.max_attempts,
                delay_ms = saturating_millis(delay),
                error = %failed,
                "attempt failed, retrying"
            );
            state.last = Some(failed);

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!(operation, attempts = attempt, "cancelled while waiting to retry");
                    return Err(state.cancelled());
                }
                _ = self.clock.sleep(delay) => {}
            }
            state.total_delay += delay;
        }
    }
}

fn saturating_millis(delay: Duration) -> u64 { u64::try_from(delay.as_millis()).unwrap_or(u64::MAX) }
