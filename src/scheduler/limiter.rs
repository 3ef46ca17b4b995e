//! Token-bucket rate limiter shared by the worker pool
//!
//! Bounds sustained outbound request rate to `R` per second with at most `R`
//! of burst headroom: the bucket starts full at capacity `R` and a background
//! ticker refills one token every `1/R` seconds. Refills fired while the
//! bucket is full are discarded, so tokens never accumulate past capacity.
//!
//! [`RateLimiter::acquire`] blocks until a token is available and cannot
//! fail; under sustained overload callers simply wait. The refill ticker is
//! a spawned task and must be torn down with [`RateLimiter::close`] (also
//! done on drop) or it outlives the owning scheduler.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Token bucket bounding operations per second
#[derive(Debug)]
pub struct RateLimiter {
    tokens: Arc<Semaphore>,
    capacity: usize,
    refill: JoinHandle<()>,
}

impl RateLimiter {
    /// Create a limiter allowing `requests_per_second` operations per second
    ///
    /// Must be called from within a Tokio runtime; the refill ticker is
    /// spawned immediately. A zero rate is clamped to one token per second.
    pub fn new(requests_per_second: u32) -> Self {
        let capacity = requests_per_second.max(1) as usize;
        let tokens = Arc::new(Semaphore::new(capacity));
        let refill = tokio::spawn(refill_tokens(Arc::clone(&tokens), capacity));

        Self {
            tokens,
            capacity,
            refill,
        }
    }

    /// Block until a token is available, then consume it
    pub async fn acquire(&self) {
        // The semaphore is never closed while the limiter is alive, so the
        // acquire cannot fail; the match keeps that assumption explicit.
        match self.tokens.acquire().await {
            Ok(permit) => permit.forget(),
            Err(_) => {}
        }
    }

    /// Bucket capacity (equals the configured rate)
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Tokens currently available
    pub fn available(&self) -> usize {
        self.tokens.available_permits()
    }

    /// Tear down the refill ticker
    pub fn close(&self) {
        self.refill.abort();
    }
}

impl Drop for RateLimiter {
    fn drop(&mut self) {
        self.refill.abort();
    }
}

/// Refill one token per interval, independent of consumers
async fn refill_tokens(tokens: Arc<Semaphore>, capacity: usize) {
    let period = Duration::from_secs(1) / capacity as u32;
    // First refill one period in, not immediately; the initial burst is the
    // full bucket and nothing more.
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        // Discard the token when the bucket is full.
        if tokens.available_permits() < capacity {
            tokens.add_permits(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{timeout, Instant};

    #[tokio::test(start_paused = true)]
    async fn test_initial_burst_is_capacity() {
        let limiter = RateLimiter::new(5);
        assert_eq!(limiter.capacity(), 5);

        for _ in 0..5 {
            limiter.acquire().await;
        }
        assert_eq!(limiter.available(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refill_paces_to_rate() {
        let limiter = RateLimiter::new(5);

        // Drain the burst.
        for _ in 0..5 {
            limiter.acquire().await;
        }

        // The sixth token arrives one refill interval later.
        let start = Instant::now();
        limiter.acquire().await;
        assert!(start.elapsed() >= Duration::from_millis(200));
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokens_do_not_accumulate_past_capacity() {
        let limiter = RateLimiter::new(2);

        // Idle long enough for many refill ticks to fire and be discarded.
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(limiter.available(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_stops_refills() {
        let limiter = RateLimiter::new(1);
        limiter.acquire().await;
        limiter.close();

        // With the ticker torn down no further token can arrive.
        let starved = timeout(Duration::from_secs(5), limiter.acquire()).await;
        assert!(starved.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_rate_is_clamped() {
        let limiter = RateLimiter::new(0);
        assert_eq!(limiter.capacity(), 1);
        limiter.acquire().await;
    }
}
