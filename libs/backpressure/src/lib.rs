//! In-process token-bucket rate limiting keyed by client IP or tenant.
//!
//! Each [`RateLimiter`] owns an independent key space. Buckets are created
//! full on first use and refill continuously; [`RateLimiter::sweep`] drops
//! buckets that have not been touched within a TTL so the map stays bounded
//! under high key cardinality.

use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use dashmap::DashMap;
use serde::Deserialize;
use tokio::task::JoinHandle;
use tracing::debug;

/// One admission consumes this many tokens.
const TOKEN: f64 = 1.0;

const BUCKETS_GAUGE: &str = "rate_limiter_buckets";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateLimit {
    pub rps: f64,
    pub burst: f64,
}

impl RateLimit {
    /// Negative rates are treated as zero and bursts below one token as one.
    pub fn new(rps: f64, burst: f64) -> Self {
        Self {
            rps: rps.max(0.0),
            burst: burst.max(TOKEN),
        }
    }
}

impl Default for RateLimit {
    fn default() -> Self {
        Self {
            rps: 5.0,
            burst: 10.0,
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("invalid rate limit overrides: {0}")]
pub struct OverridesError(#[from] serde_json::Error);

/// Default limit plus optional per-key overrides.
#[derive(Debug, Clone, Default)]
pub struct RateLimits {
    default: RateLimit,
    overrides: HashMap<String, RateLimit>,
}

#[derive(Debug, Deserialize)]
struct KeyRateLimit {
    rps: f64,
    burst: f64,
}

impl RateLimits {
    pub fn new(default: RateLimit) -> Self {
        Self {
            default,
            overrides: HashMap::new(),
        }
    }

    pub fn with_override(mut self, key: impl Into<String>, limit: RateLimit) -> Self {
        self.overrides.insert(key.into(), limit);
        self
    }

    /// Parses `{"tenant-a": {"rps": 10, "burst": 20}}` style overrides.
    pub fn with_overrides_json(mut self, raw: &str) -> Result<Self, OverridesError> {
        let parsed: HashMap<String, KeyRateLimit> = serde_json::from_str(raw)?;
        for (key, cfg) in parsed {
            self.overrides
                .insert(key, RateLimit::new(cfg.rps.max(0.1), cfg.burst));
        }
        Ok(self)
    }

    pub fn get(&self, key: &str) -> RateLimit {
        self.overrides.get(key).copied().unwrap_or(self.default)
    }

    pub fn default_limit(&self) -> RateLimit {
        self.default
    }
}

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
    last_seen: Instant,
}

impl Bucket {
    fn full(limit: RateLimit, now: Instant) -> Self {
        Self {
            tokens: limit.burst,
            last_refill: now,
            last_seen: now,
        }
    }

    fn refill(&mut self, limit: RateLimit, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_refill);
        if elapsed.is_zero() {
            return;
        }
        self.tokens = (self.tokens + elapsed.as_secs_f64() * limit.rps).min(limit.burst);
        self.last_refill = now;
    }

    fn try_take(&mut self, limit: RateLimit, now: Instant) -> bool {
        self.refill(limit, now);
        self.last_seen = now;
        if self.tokens >= TOKEN {
            self.tokens -= TOKEN;
            true
        } else {
            false
        }
    }
}

/// Token-bucket limiter; clones share the same buckets.
#[derive(Clone, Debug)]
pub struct RateLimiter {
    name: &'static str,
    limits: Arc<RateLimits>,
    buckets: Arc<DashMap<String, Bucket>>,
}

impl RateLimiter {
    pub fn new(name: &'static str, limit: RateLimit) -> Self {
        Self::with_limits(name, RateLimits::new(limit))
    }

    pub fn with_limits(name: &'static str, limits: RateLimits) -> Self {
        Self {
            name,
            limits: Arc::new(limits),
            buckets: Arc::new(DashMap::new()),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn limits(&self) -> &RateLimits {
        &self.limits
    }

    /// Admits one request for `key`, consuming a token when available.
    pub fn check(&self, key: &str) -> bool {
        self.check_at(key, Instant::now())
    }

    pub fn check_at(&self, key: &str, now: Instant) -> bool {
        let limit = self.limits.get(key);
        if let Some(mut bucket) = self.buckets.get_mut(key) {
            return bucket.try_take(limit, now);
        }
        self.buckets
            .entry(key.to_string())
            .or_insert_with(|| Bucket::full(limit, now))
            .try_take(limit, now)
    }

    /// Tokens currently available for `key`, if a bucket exists.
    pub fn available(&self, key: &str) -> Option<f64> {
        self.buckets.get(key).map(|bucket| bucket.tokens)
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Removes buckets idle for longer than `ttl`; returns how many were dropped.
    pub fn sweep(&self, ttl: Duration) -> usize {
        self.sweep_at(ttl, Instant::now())
    }

    pub fn sweep_at(&self, ttl: Duration, now: Instant) -> usize {
        let before = self.buckets.len();
        self.buckets
            .retain(|_, bucket| now.saturating_duration_since(bucket.last_seen) <= ttl);
        let remaining = self.buckets.len();
        metrics::gauge!(BUCKETS_GAUGE, "limiter" => self.name).set(remaining as f64);
        let evicted = before.saturating_sub(remaining);
        if evicted > 0 {
            debug!(limiter = self.name, evicted, remaining, "evicted idle rate limit buckets");
        }
        evicted
    }

    /// Runs [`RateLimiter::sweep`] every `interval` until the handle is aborted.
    pub fn spawn_sweeper(&self, interval: Duration, ttl: Duration) -> JoinHandle<()> {
        let limiter = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                limiter.sweep(ttl);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn burst_then_reject_then_single_refill() {
        let limiter = RateLimiter::new("test", RateLimit::new(4.0, 3.0));
        let start = Instant::now();
        for _ in 0..3 {
            assert!(limiter.check_at("client", start));
        }
        assert!(!limiter.check_at("client", start));

        let later = start + Duration::from_millis(250);
        assert!(limiter.check_at("client", later));
        assert!(!limiter.check_at("client", later));
    }

    #[test]
    fn limiter_refills_after_wait() {
        let limiter = RateLimiter::new("test", RateLimit::new(10.0, 1.0));
        assert!(limiter.check("client"));
        assert!(!limiter.check("client"));
        std::thread::sleep(Duration::from_millis(120));
        assert!(limiter.check("client"));
    }

    #[test]
    fn refill_never_exceeds_burst() {
        let limiter = RateLimiter::new("test", RateLimit::new(100.0, 2.0));
        let start = Instant::now();
        assert!(limiter.check_at("k", start));
        let much_later = start + Duration::from_secs(60);
        assert!(limiter.check_at("k", much_later));
        assert_eq!(limiter.available("k"), Some(1.0));
    }

    #[test]
    fn limiter_isolated_per_key() {
        let limiter = RateLimiter::new("test", RateLimit::new(0.0, 1.0));
        assert!(limiter.check("a"));
        assert!(limiter.check("b"));
        assert!(!limiter.check("a"));
        assert!(!limiter.check("b"));
    }

    #[test]
    fn clones_share_buckets() {
        let limiter = RateLimiter::new("test", RateLimit::new(0.0, 1.0));
        let clone = limiter.clone();
        assert!(limiter.check("shared"));
        assert!(!clone.check("shared"));
    }

    #[test]
    fn concurrent_checks_never_over_admit() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let limiter = RateLimiter::new("test", RateLimit::new(0.0, 500.0));
        let admitted = AtomicUsize::new(0);
        std::thread::scope(|scope| {
            for _ in 0..16 {
                scope.spawn(|| {
                    for _ in 0..200 {
                        if limiter.check("shared") {
                            admitted.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                });
            }
        });
        assert_eq!(admitted.load(Ordering::Relaxed), 500);
        assert_eq!(limiter.len(), 1);
    }

    #[test]
    fn overrides_apply_per_key() {
        let limits = RateLimits::new(RateLimit::new(0.0, 1.0))
            .with_overrides_json(r#"{ "t1": {"rps": 10, "burst": 3} }"#)
            .expect("overrides");
        assert_eq!(limits.get("t1"), RateLimit::new(10.0, 3.0));
        assert_eq!(limits.get("unknown"), RateLimit::new(0.0, 1.0));

        let limiter = RateLimiter::with_limits("tenant", limits);
        let now = Instant::now();
        assert!(limiter.check_at("t1", now));
        assert!(limiter.check_at("t1", now));
        assert!(limiter.check_at("t1", now));
        assert!(!limiter.check_at("t1", now));
        assert!(limiter.check_at("t2", now));
        assert!(!limiter.check_at("t2", now));
    }

    #[test]
    fn malformed_overrides_are_rejected() {
        let err = RateLimits::default().with_overrides_json("not json").unwrap_err();
        assert!(err.to_string().starts_with("invalid rate limit overrides"));
    }

    #[test]
    fn rate_limit_new_clamps_values() {
        let limit = RateLimit::new(-1.0, 0.0);
        assert_eq!(limit.rps, 0.0);
        assert_eq!(limit.burst, 1.0);
    }

    #[test]
    fn sweep_evicts_only_idle_buckets() {
        let limiter = RateLimiter::new("test", RateLimit::default());
        let start = Instant::now();
        limiter.check_at("old", start);
        limiter.check_at("fresh", start + Duration::from_secs(500));

        let evicted = limiter.sweep_at(Duration::from_secs(600), start + Duration::from_secs(700));
        assert_eq!(evicted, 1);
        assert_eq!(limiter.len(), 1);
        assert!(limiter.available("old").is_none());
        assert!(limiter.available("fresh").is_some());
    }

    #[test]
    fn evicted_key_starts_with_full_bucket() {
        let limiter = RateLimiter::new("test", RateLimit::new(0.0, 2.0));
        let start = Instant::now();
        assert!(limiter.check_at("ip", start));
        assert!(limiter.check_at("ip", start));
        assert!(!limiter.check_at("ip", start));

        let later = start + Duration::from_secs(30);
        limiter.sweep_at(Duration::from_secs(10), later);
        assert!(limiter.is_empty());
        assert!(limiter.check_at("ip", later));
    }

    #[tokio::test]
    async fn sweeper_task_evicts_in_background() {
        let limiter = RateLimiter::new("test", RateLimit::default());
        limiter.check("transient");
        let handle = limiter.spawn_sweeper(Duration::from_millis(20), Duration::from_millis(5));
        tokio::time::sleep(Duration::from_millis(200)).await;
        handle.abort();
        assert!(limiter.is_empty());
    }
}
