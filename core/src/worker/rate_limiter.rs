//! Rate limiting for page dispatch

use governor::{clock::DefaultClock, state::InMemoryState, state::NotKeyed, Quota, RateLimiter};
use std::time::Duration;

use crate::cancel::CancellationSignal;
use crate::config::RateLimit;

/// Admission was not granted
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum LimiterError {
    /// The shutdown signal was set before or while waiting for a permit
    #[error("admission aborted by shutdown")]
    Cancelled,
}

/// Token bucket gate shared by every page dispatch via the governor crate
///
/// Permits replenish one at a time, every `period / max_requests`, with a
/// burst size of one. The limiter holds no dispatch state, so a single
/// instance can be shared (via `Arc`) across any number of callers.
pub struct PageRateLimiter {
    limiter: Option<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
    rate_limit: Option<RateLimit>,
}

impl PageRateLimiter {
    /// Create a new rate limiter
    ///
    /// # Examples
    /// ```
    /// use pagedrain_core::{PageRateLimiter, RateLimit};
    ///
    /// // 1000 admissions per minute, one every 60ms
    /// let limiter = PageRateLimiter::new(RateLimit::per_minute(1000));
    /// assert!(limiter.is_enabled());
    /// ```
    pub fn new(rate_limit: RateLimit) -> Self {
        let limiter = rate_limit
            .min_spacing()
            .and_then(Quota::with_period)
            .map(RateLimiter::direct);

        Self {
            limiter,
            rate_limit: Some(rate_limit),
        }
    }

    /// Create a limiter that admits every caller immediately
    pub fn unlimited() -> Self {
        Self {
            limiter: None,
            rate_limit: None,
        }
    }

    /// Wait until a permit is available
    ///
    /// Returns `Err(LimiterError::Cancelled)` if `shutdown` is already set
    /// or becomes set while waiting. Waiters are served in roughly the
    /// order they arrive.
    pub async fn admit(&self, shutdown: &CancellationSignal) -> Result<(), LimiterError> {
        if shutdown.is_cancelled() {
            return Err(LimiterError::Cancelled);
        }

        let Some(ref limiter) = self.limiter else {
            return Ok(());
        };

        tokio::select! {
            biased;

            _ = shutdown.cancelled() => Err(LimiterError::Cancelled),
            _ = limiter.until_ready() => Ok(()),
        }
    }

    /// Try to take a permit without waiting
    ///
    /// Always returns `true` if the limiter is unlimited.
    pub fn try_admit(&self) -> bool {
        match &self.limiter {
            Some(limiter) => limiter.check().is_ok(),
            None => true,
        }
    }

    /// Check if rate limiting is enabled
    pub fn is_enabled(&self) -> bool {
        self.limiter.is_some()
    }

    /// Get the configured rate limit
    pub fn rate_limit(&self) -> Option<RateLimit> {
        self.rate_limit
    }

    /// Minimum gap between two admissions
    pub fn min_spacing(&self) -> Option<Duration> {
        self.rate_limit.and_then(|r| r.min_spacing())
    }
}

impl Default for PageRateLimiter {
    fn default() -> Self {
        Self::new(RateLimit::default())
    }
}

impl std::fmt::Debug for PageRateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageRateLimiter")
            .field("rate_limit", &self.rate_limit)
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Instant;
    use tokio::sync::Mutex;

    #[test]
    fn test_rate_limiter_unlimited() {
        let limiter = PageRateLimiter::unlimited();
        assert!(!limiter.is_enabled());
        assert!(limiter.rate_limit().is_none());
        assert!(limiter.try_admit());
        assert!(limiter.try_admit());
    }

    #[test]
    fn test_rate_limiter_default() {
        let limiter = PageRateLimiter::default();
        assert!(limiter.is_enabled());
        assert_eq!(limiter.min_spacing(), Some(Duration::from_millis(60)));
    }

    #[test]
    fn test_rate_limiter_degenerate_limit_disabled() {
        let limiter = PageRateLimiter::new(RateLimit::per_second(0));
        assert!(!limiter.is_enabled());
    }

    #[test]
    fn test_rate_limiter_burst_of_one() {
        let limiter = PageRateLimiter::new(RateLimit::per_second(1));
        assert!(limiter.try_admit());
        assert!(!limiter.try_admit());
    }

    #[tokio::test]
    async fn test_admit_immediately_first_time() {
        let limiter = PageRateLimiter::new(RateLimit::per_second(1000));
        let shutdown = CancellationSignal::new();
        assert_eq!(limiter.admit(&shutdown).await, Ok(()));
    }

    #[tokio::test]
    async fn test_admit_rejects_when_already_shut_down() {
        let limiter = PageRateLimiter::unlimited();
        let shutdown = CancellationSignal::new();
        shutdown.cancel();
        assert_eq!(limiter.admit(&shutdown).await, Err(LimiterError::Cancelled));
    }

    #[tokio::test]
    async fn test_admit_aborted_while_waiting() {
        // One permit per 10s: the second admit would wait a long time.
        let limiter = Arc::new(PageRateLimiter::new(RateLimit::new(1, Duration::from_secs(10))));
        let shutdown = Arc::new(CancellationSignal::new());
        limiter.admit(&shutdown).await.unwrap();

        let waiter = {
            let limiter = Arc::clone(&limiter);
            let shutdown = Arc::clone(&shutdown);
            tokio::spawn(async move { limiter.admit(&shutdown).await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        shutdown.cancel();

        let result = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("admit should abort promptly")
            .unwrap();
        assert_eq!(result, Err(LimiterError::Cancelled));
    }

    #[tokio::test]
    async fn test_admit_spacing() {
        // 50 per second: one permit every 20ms
        let limiter = PageRateLimiter::new(RateLimit::per_second(50));
        let shutdown = CancellationSignal::new();

        let start = Instant::now();
        for _ in 0..6 {
            limiter.admit(&shutdown).await.unwrap();
        }
        // First permit is free, the next five wait ~20ms each
        assert!(start.elapsed() >= Duration::from_millis(95));
    }

    #[tokio::test]
    async fn test_admit_sliding_window_conformance() {
        // 10 per 200ms, shared across many concurrent callers
        let rate = RateLimit::new(10, Duration::from_millis(200));
        let limiter = Arc::new(PageRateLimiter::new(rate));
        let shutdown = Arc::new(CancellationSignal::new());
        let admitted = Arc::new(Mutex::new(Vec::new()));

        let mut handles = Vec::new();
        for _ in 0..30 {
            let limiter = Arc::clone(&limiter);
            let shutdown = Arc::clone(&shutdown);
            let admitted = Arc::clone(&admitted);
            handles.push(tokio::spawn(async move {
                limiter.admit(&shutdown).await.unwrap();
                admitted.lock().await.push(Instant::now());
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let mut times = admitted.lock().await.clone();
        times.sort();
        assert_eq!(times.len(), 30);

        let period = rate.period();
        for (i, start) in times.iter().enumerate() {
            let in_window = times[i..]
                .iter()
                .take_while(|t| t.duration_since(*start) < period)
                .count();
            // Allow two extra for scheduler jitter on wakeup
            assert!(
                in_window <= rate.max_requests as usize + 2,
                "window starting at {} admitted {}",
                i,
                in_window
            );
        }
    }

    #[test]
    fn test_rate_limiter_debug() {
        let limiter = PageRateLimiter::new(RateLimit::per_second(100));
        let debug = format!("{:?}", limiter);
        assert!(debug.contains("PageRateLimiter"));
        assert!(debug.contains("max_requests: 100"));
        assert!(debug.contains("true"));
    }
}
