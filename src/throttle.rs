//! Token-bucket rate limiter for grain triggers.
//!
//! Requests beyond the refill rate are refused outright, never queued: a
//! late grain is worse than a missing one.

use std::time::Instant;

#[derive(Debug, Clone)]
pub struct TokenBucket {
    rate_per_sec: f64,
    capacity: f64,
    tokens: f64,
    last_refill: Option<Instant>,
}

impl TokenBucket {
    /// Bucket refilled at `rate_per_sec`, holding at most `capacity` tokens.
    /// Starts full.
    pub fn new(rate_per_sec: f64, capacity: f64) -> Self {
        let capacity = capacity.max(1.0);
        Self {
            rate_per_sec: rate_per_sec.max(0.0),
            capacity,
            tokens: capacity,
            last_refill: None,
        }
    }

    pub fn rate_per_sec(&self) -> f64 {
        self.rate_per_sec
    }

    fn refill(&mut self, now: Instant) {
        if let Some(last) = self.last_refill {
            let elapsed = now.saturating_duration_since(last).as_secs_f64();
            self.tokens = (self.tokens + elapsed * self.rate_per_sec).min(self.capacity);
        }
        // Out-of-order timestamps never move the clock backwards
        if self.last_refill.map_or(true, |last| now > last) {
            self.last_refill = Some(now);
        }
    }

    /// Take one token if available
    pub fn try_take(&mut self, now: Instant) -> bool {
        self.refill(now);
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}
