use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

/// Time source for the retry loop.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;

    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send;
}

/// Tokio's timer. Honors paused time in tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

impl Clock for TokioClock {
    fn now(&self) -> Instant { Instant::now() }

    async fn sleep(&self, duration: Duration) { tokio::time::sleep(duration).await }
}
