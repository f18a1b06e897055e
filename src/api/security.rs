//! Rate limiting for the wager endpoints.
//!
//! A token-bucket per client, held in an explicit injected store rather than
//! ambient module state: the limiter is constructed once, carries its own
//! eviction policy for idle buckets, and scales horizontally by being
//! per-process intentionally coarse. It throttles request volume only; the
//! ledger's per-account atomicity is what protects balances.

use crate::config::RateLimitConfig;
use dashmap::DashMap;
use std::time::{Duration, Instant};

#[derive(Debug)]
struct TokenBucket {
    tokens: f64,
    last_refill: Instant,
    capacity: f64,
    refill_rate: f64, // tokens per second
}

impl TokenBucket {
    fn new(capacity: u32, refill_rate_per_minute: u32) -> Self {
        Self {
            tokens: capacity as f64,
            last_refill: Instant::now(),
            capacity: capacity as f64,
            refill_rate: refill_rate_per_minute as f64 / 60.0,
        }
    }

    fn try_consume(&mut self) -> bool {
        self.refill();
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_rate).min(self.capacity);
        self.last_refill = now;
    }
}

pub struct RateLimiter {
    config: RateLimitConfig,
    buckets: DashMap<String, TokenBucket>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            buckets: DashMap::new(),
        }
    }

    /// Consume one token for the client key; false means throttled.
    pub fn check(&self, client_key: &str) -> bool {
        let mut bucket = self.buckets.entry(client_key.to_string()).or_insert_with(|| {
            TokenBucket::new(
                self.config.burst_capacity,
                self.config.requests_per_minute,
            )
        });
        bucket.try_consume()
    }

    /// Drop buckets idle past the configured eviction window.
    pub fn sweep_idle(&self) {
        let idle_limit = Duration::from_secs(self.config.idle_eviction_secs);
        let now = Instant::now();
        self.buckets
            .retain(|_, bucket| now.duration_since(bucket.last_refill) < idle_limit);
    }

    #[cfg(test)]
    fn bucket_count(&self) -> usize {
        self.buckets.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(burst: u32, per_minute: u32) -> RateLimitConfig {
        RateLimitConfig {
            requests_per_minute: per_minute,
            burst_capacity: burst,
            idle_eviction_secs: 600,
        }
    }

    #[test]
    fn test_burst_then_throttle() {
        let limiter = RateLimiter::new(config(3, 60));
        assert!(limiter.check("c1"));
        assert!(limiter.check("c1"));
        assert!(limiter.check("c1"));
        assert!(!limiter.check("c1"));
        // Other clients are unaffected.
        assert!(limiter.check("c2"));
    }

    #[test]
    fn test_sweep_keeps_active_buckets() {
        let limiter = RateLimiter::new(config(3, 60));
        limiter.check("c1");
        limiter.sweep_idle();
        assert_eq!(limiter.bucket_count(), 1);
    }
}
