//! Minimum spacing between outbound units.

use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Enforces a minimum delay between consecutive units.
#[derive(Debug)]
pub struct Pacer {
    last_start: Option<Instant>,
    min_delay: Duration,
}

impl Pacer {
    /// A pacer spacing units at least `min_delay` apart.
    #[must_use]
    pub fn new(min_delay: Duration) -> Self {
        Self {
            last_start: None,
            min_delay,
        }
    }

    /// Wait until the next unit may start. The first call never waits.
    ///
    /// Returns `false` if `cancel` fired while waiting.
    pub async fn wait(&mut self, cancel: &CancellationToken) -> bool {
        if let Some(last) = self.last_start {
            let elapsed = last.elapsed();
            if elapsed < self.min_delay && !sleep_or_cancel(self.min_delay - elapsed, cancel).await
            {
                return false;
            }
        }
        self.last_start = Some(Instant::now());
        true
    }
}

/// Sleep for `delay` unless cancelled first. Returns `false` on cancel.
pub async fn sleep_or_cancel(delay: Duration, cancel: &CancellationToken) -> bool {
    if delay.is_zero() {
        return !cancel.is_cancelled();
    }
    tokio::select! {
        () = cancel.cancelled() => false,
        () = tokio::time::sleep(delay) => true,
    }
}
