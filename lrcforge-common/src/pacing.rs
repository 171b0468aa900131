//! Outbound request pacing
//!
//! Keeps calls to an external service at least `min_interval` apart.
//! Callers share one [`RequestPacer`] per service.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Minimum-interval pacer for requests to one service
#[derive(Debug)]
pub struct RequestPacer {
    name: &'static str,
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl RequestPacer {
    pub fn new(name: &'static str, min_interval: Duration) -> Self {
        Self {
            name,
            min_interval,
            last_request: Mutex::new(None),
        }
    }

    pub fn from_millis(name: &'static str, min_interval_ms: u64) -> Self {
        Self::new(name, Duration::from_millis(min_interval_ms))
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Sleep until the next request may go out; returns the time waited
    ///
    /// The lock is held while sleeping, so concurrent callers queue up.
    pub async fn acquire(&self) -> Duration {
        let mut last = self.last_request.lock().await;

        let waited = match *last {
            Some(previous) => self.min_interval.saturating_sub(previous.elapsed()),
            None => Duration::ZERO,
        };

        if !waited.is_zero() {
            tracing::debug!(service = self.name, "Request pacing: waiting {:?}", waited);
            tokio::time::sleep(waited).await;
        }

        *last = Some(Instant::now());
        waited
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_first_request_is_immediate() {
        let pacer = RequestPacer::from_millis("test", 500);
        assert_eq!(pacer.acquire().await, Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_back_to_back_requests_are_spaced() {
        let pacer = RequestPacer::from_millis("test", 500);
        let start = Instant::now();

        pacer.acquire().await;
        pacer.acquire().await;
        pacer.acquire().await;

        assert!(start.elapsed() >= Duration::from_millis(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_wait_after_interval_has_passed() {
        let pacer = RequestPacer::from_millis("test", 200);
        pacer.acquire().await;

        tokio::time::sleep(Duration::from_millis(300)).await;

        assert_eq!(pacer.acquire().await, Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_interval_never_waits() {
        let pacer = RequestPacer::new("test", Duration::ZERO);
        pacer.acquire().await;
        assert_eq!(pacer.acquire().await, Duration::ZERO);
    }
}
