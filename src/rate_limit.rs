//! Token bucket limiter for the volume provider quota.
//!
//! Implemented as a GCRA (the "virtual scheduling" form of a token bucket):
//! a single theoretical arrival time is enough to decide whether a token is
//! available, and all arithmetic stays in exact `Duration`s.

use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

pub struct RateLimiter {
    capacity: u32,
    refill_interval: Duration,
    // Theoretical arrival time of the next conforming call
    next_at: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// Bucket holding `capacity` tokens, one token refilled every `refill_interval`
    pub fn new(capacity: u32, refill_interval: Duration) -> Self {
        Self {
            capacity: capacity.max(1),
            refill_interval,
            next_at: Mutex::new(None),
        }
    }

    /// Strict spacing: the first call passes immediately, every later call waits
    /// until `delay` after the previous one
    pub fn per_call(delay: Duration) -> Self {
        Self::new(1, delay)
    }

    /// Spacing derived from a calls-per-minute quota
    pub fn per_minute(calls: u32) -> Self {
        Self::per_call(Duration::from_secs(60) / calls.max(1))
    }

    pub fn refill_interval(&self) -> Duration {
        self.refill_interval
    }

    /// Take a token at `now`, or return how long the caller must wait for one
    pub fn try_acquire_at(&self, now: Instant) -> Result<(), Duration> {
        let mut next_at = self
            .next_at
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let tat = next_at.map_or(now, |t| t.max(now));
        let burst_window = self.refill_interval * (self.capacity - 1);
        let ahead = tat.saturating_duration_since(now);

        if ahead > burst_window {
            return Err(ahead - burst_window);
        }

        *next_at = Some(tat + self.refill_interval);
        Ok(())
    }

    /// Wait until a token is available and take it. Returns the time spent waiting.
    pub async fn acquire(&self) -> Duration {
        let started = Instant::now();
        loop {
            match self.try_acquire_at(Instant::now()) {
                Ok(()) => return started.elapsed(),
                Err(wait) => {
                    tracing::trace!("rate limiter: waiting {:?}", wait);
                    tokio::time::sleep(wait).await;
                }
            }
        }
    }
}
