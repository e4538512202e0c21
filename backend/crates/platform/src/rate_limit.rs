//! Rate Limiting Infrastructure
//!
//! Fixed-window request counting on top of a [`CounterCache`]. The cache is
//! the only source of truth, so every replica behind the same cache shares
//! one quota per client.
//!
//! The window starts at a client's first request and lasts for the counter's
//! TTL. It is not sliding: a burst straddling the expiry can admit up to twice
//! the quota.

use crate::cache::{CacheResult, CounterCache};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// How the counter is read and bumped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RateLimitStrategy {
    /// `EXISTS`, then `GET` and compare, then `INCR`.
    ///
    /// Requests from one client racing between the compare and the `INCR` can
    /// all be admitted, so the quota is approximate under concurrency.
    #[default]
    CheckThenIncrement,
    /// `INCR` first and compare the returned value. Exact under concurrency.
    IncrementThenCompare,
}

impl FromStr for RateLimitStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "check_then_increment" | "check" => Ok(Self::CheckThenIncrement),
            "increment_then_compare" | "atomic" => Ok(Self::IncrementThenCompare),
            other => Err(format!("unknown rate limit strategy: {other}")),
        }
    }
}

/// Rate limit configuration
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Maximum requests admitted per window
    pub max_requests: u32,
    /// Counter TTL, measured from the first request of a window
    pub window: Duration,
    /// Prepended to the client identity to form the cache key
    pub key_prefix: String,
    pub strategy: RateLimitStrategy,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 5,
            window: Duration::from_secs(180),
            key_prefix: "rate:".to_string(),
            strategy: RateLimitStrategy::default(),
        }
    }
}

impl RateLimitConfig {
    pub fn new(max_requests: u32, window_secs: u64) -> Self {
        Self {
            max_requests,
            window: Duration::from_secs(window_secs),
            ..Self::default()
        }
    }

    pub fn with_strategy(mut self, strategy: RateLimitStrategy) -> Self {
        self.strategy = strategy;
        self
    }
}

/// Rate limit check result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitResult {
    pub allowed: bool,
    /// Counter value after this request was accounted for
    pub count: i64,
    pub remaining: u32,
}

/// Per-client limiter. Cheap to clone; all state lives in the cache.
pub struct RateLimiter<C> {
    cache: Arc<C>,
    config: Arc<RateLimitConfig>,
}

impl<C> Clone for RateLimiter<C> {
    fn clone(&self) -> Self {
        Self {
            cache: self.cache.clone(),
            config: self.config.clone(),
        }
    }
}

impl<C> RateLimiter<C>
where
    C: CounterCache + Send + Sync + 'static,
{
    pub fn new(cache: Arc<C>, config: RateLimitConfig) -> Self {
        Self {
            cache,
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    pub fn key_for(&self, identity: &str) -> String {
        format!("{}{}", self.config.key_prefix, identity)
    }

    /// Account for one request from `identity` and decide whether to admit it.
    ///
    /// Any cache failure is returned as an error; callers must reject the
    /// request rather than admit it.
    pub async fn check(&self, identity: &str) -> CacheResult<RateLimitResult> {
        // A zero quota admits nothing, whatever the strategy.
        if self.quota() == 0 {
            return Ok(self.result(false, 0));
        }

        let key = self.key_for(identity);
        match self.config.strategy {
            RateLimitStrategy::CheckThenIncrement => self.check_then_increment(&key).await,
            RateLimitStrategy::IncrementThenCompare => self.increment_then_compare(&key).await,
        }
    }

    async fn check_then_increment(&self, key: &str) -> CacheResult<RateLimitResult> {
        if !self.cache.exists(key).await? {
            return self.open_window(key).await;
        }

        // The key can expire between EXISTS and GET.
        let Some(count) = self.cache.get_integer(key).await? else {
            return self.open_window(key).await;
        };

        if count >= self.quota() {
            return Ok(self.result(false, count));
        }

        let count = self.cache.increment(key).await?;
        if count == 1 {
            // Expired between GET and INCR: INCR recreated the key without a TTL.
            self.cache.expire(key, self.config.window).await?;
        }
        Ok(self.result(true, count))
    }

    async fn increment_then_compare(&self, key: &str) -> CacheResult<RateLimitResult> {
        let count = self.cache.increment(key).await?;
        if count == 1 {
            self.cache.expire(key, self.config.window).await?;
        }
        Ok(self.result(count <= self.quota(), count))
    }

    async fn open_window(&self, key: &str) -> CacheResult<RateLimitResult> {
        self.cache.set_integer(key, 1, self.config.window).await?;
        tracing::debug!(
            key = %key,
            window_secs = self.config.window.as_secs(),
            "Opened rate limit window"
        );
        Ok(self.result(true, 1))
    }

    fn quota(&self) -> i64 {
        i64::from(self.config.max_requests)
    }

    fn result(&self, allowed: bool, count: i64) -> RateLimitResult {
        let remaining = (self.quota() - count).clamp(0, self.quota());
        RateLimitResult {
            allowed,
            count,
            remaining: u32::try_from(remaining).unwrap_or(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheError, InMemoryCounterCache};

    fn limiter(
        strategy: RateLimitStrategy,
    ) -> (Arc<InMemoryCounterCache>, RateLimiter<InMemoryCounterCache>) {
        let cache = Arc::new(InMemoryCounterCache::new());
        let config = RateLimitConfig::new(5, 180).with_strategy(strategy);
        (cache.clone(), RateLimiter::new(cache, config))
    }

    #[test]
    fn test_default_config() {
        let config = RateLimitConfig::default();
        assert_eq!(config.max_requests, 5);
        assert_eq!(config.window, Duration::from_secs(180));
        assert_eq!(config.key_prefix, "rate:");
        assert_eq!(config.strategy, RateLimitStrategy::CheckThenIncrement);
    }

    #[test]
    fn test_strategy_from_str() {
        assert_eq!(
            "atomic".parse::<RateLimitStrategy>().unwrap(),
            RateLimitStrategy::IncrementThenCompare
        );
        assert_eq!(
            "Check_Then_Increment".parse::<RateLimitStrategy>().unwrap(),
            RateLimitStrategy::CheckThenIncrement
        );
        assert!("sliding".parse::<RateLimitStrategy>().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_quota_admitted_then_rejected() {
        for strategy in [
            RateLimitStrategy::CheckThenIncrement,
            RateLimitStrategy::IncrementThenCompare,
        ] {
            let (_, limiter) = limiter(strategy);

            for n in 1..=5 {
                let result = limiter.check("10.0.0.1").await.unwrap();
                assert!(result.allowed, "{strategy:?}: request {n} should be admitted");
                assert_eq!(result.remaining, 5 - n);
            }

            let result = limiter.check("10.0.0.1").await.unwrap();
            assert!(!result.allowed, "{strategy:?}: request 6 should be rejected");
            assert_eq!(result.remaining, 0);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejection_does_not_increment() {
        let (cache, limiter) = limiter(RateLimitStrategy::CheckThenIncrement);
        for _ in 0..8 {
            limiter.check("10.0.0.2").await.unwrap();
        }
        assert_eq!(cache.get_integer("rate:10.0.0.2").await.unwrap(), Some(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_resets_after_ttl() {
        let (cache, limiter) = limiter(RateLimitStrategy::CheckThenIncrement);
        for _ in 0..6 {
            limiter.check("10.0.0.3").await.unwrap();
        }
        assert!(!limiter.check("10.0.0.3").await.unwrap().allowed);

        tokio::time::advance(Duration::from_secs(181)).await;

        let result = limiter.check("10.0.0.3").await.unwrap();
        assert!(result.allowed);
        assert_eq!(result.count, 1);
        assert_eq!(cache.get_integer("rate:10.0.0.3").await.unwrap(), Some(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_atomic_strategy_sets_ttl_on_first_increment() {
        let (cache, limiter) = limiter(RateLimitStrategy::IncrementThenCompare);
        limiter.check("10.0.0.4").await.unwrap();

        tokio::time::advance(Duration::from_secs(181)).await;
        assert!(!cache.exists("rate:10.0.0.4").await.unwrap());
    }

    #[tokio::test]
    async fn test_clients_are_independent() {
        let (_, limiter) = limiter(RateLimitStrategy::CheckThenIncrement);
        for _ in 0..5 {
            limiter.check("10.0.0.5").await.unwrap();
        }
        assert!(!limiter.check("10.0.0.5").await.unwrap().allowed);
        assert!(limiter.check("10.0.0.6").await.unwrap().allowed);
    }

    /// Cache whose every call fails, optionally after `exists` succeeds.
    struct FailingCache {
        exists_ok: bool,
    }

    impl CounterCache for FailingCache {
        async fn exists(&self, _key: &str) -> CacheResult<bool> {
            if self.exists_ok {
                Ok(true)
            } else {
                Err(CacheError::Timeout(Duration::from_millis(5)))
            }
        }

        async fn get_integer(&self, _key: &str) -> CacheResult<Option<i64>> {
            Err(CacheError::Timeout(Duration::from_millis(5)))
        }

        async fn set_integer(&self, _key: &str, _value: i64, _ttl: Duration) -> CacheResult<()> {
            Err(CacheError::Timeout(Duration::from_millis(5)))
        }

        async fn increment(&self, _key: &str) -> CacheResult<i64> {
            Err(CacheError::Timeout(Duration::from_millis(5)))
        }

        async fn expire(&self, _key: &str, _ttl: Duration) -> CacheResult<bool> {
            Err(CacheError::Timeout(Duration::from_millis(5)))
        }
    }

    #[tokio::test]
    async fn test_cache_failure_is_an_error_at_every_step() {
        for exists_ok in [false, true] {
            let cache = Arc::new(FailingCache { exists_ok });
            let limiter = RateLimiter::new(cache, RateLimitConfig::default());
            assert!(limiter.check("10.0.0.7").await.is_err());
        }
    }

    #[tokio::test]
    async fn test_zero_quota_rejects_first_request() {
        for strategy in [
            RateLimitStrategy::CheckThenIncrement,
            RateLimitStrategy::IncrementThenCompare,
        ] {
            let cache = Arc::new(InMemoryCounterCache::new());
            let limiter = RateLimiter::new(
                cache.clone(),
                RateLimitConfig::new(0, 180).with_strategy(strategy),
            );

            let result = limiter.check("10.0.0.8").await.unwrap();
            assert!(!result.allowed, "{strategy:?}");
            assert_eq!(result.remaining, 0);
            assert!(cache.is_empty().await, "{strategy:?}");
        }
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Exists,
        Get,
        Set(i64, Duration),
        Incr,
        Expire(Duration),
    }

    /// Replays fixed answers and records every call.
    struct ScriptedCache {
        exists: bool,
        value: Option<i64>,
        incremented: i64,
        calls: std::sync::Mutex<Vec<Call>>,
    }

    impl ScriptedCache {
        fn new(exists: bool, value: Option<i64>, incremented: i64) -> Self {
            Self {
                exists,
                value,
                incremented,
                calls: std::sync::Mutex::new(Vec::new()),
            }
        }

        fn record(&self, call: Call) {
            self.calls.lock().unwrap().push(call);
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl CounterCache for ScriptedCache {
        async fn exists(&self, _key: &str) -> CacheResult<bool> {
            self.record(Call::Exists);
            Ok(self.exists)
        }

        async fn get_integer(&self, _key: &str) -> CacheResult<Option<i64>> {
            self.record(Call::Get);
            Ok(self.value)
        }

        async fn set_integer(&self, _key: &str, value: i64, ttl: Duration) -> CacheResult<()> {
            self.record(Call::Set(value, ttl));
            Ok(())
        }

        async fn increment(&self, _key: &str) -> CacheResult<i64> {
            self.record(Call::Incr);
            Ok(self.incremented)
        }

        async fn expire(&self, _key: &str, ttl: Duration) -> CacheResult<bool> {
            self.record(Call::Expire(ttl));
            Ok(true)
        }
    }

    #[tokio::test]
    async fn test_key_gone_between_exists_and_get_opens_window() {
        let cache = Arc::new(ScriptedCache::new(true, None, 0));
        let limiter = RateLimiter::new(cache.clone(), RateLimitConfig::new(5, 180));

        let result = limiter.check("10.0.0.9").await.unwrap();
        assert!(result.allowed);
        assert_eq!(result.count, 1);
        assert_eq!(
            cache.calls(),
            [
                Call::Exists,
                Call::Get,
                Call::Set(1, Duration::from_secs(180))
            ]
        );
    }

    #[tokio::test]
    async fn test_key_gone_before_incr_rearms_ttl() {
        let cache = Arc::new(ScriptedCache::new(true, Some(2), 1));
        let limiter = RateLimiter::new(cache.clone(), RateLimitConfig::new(5, 180));

        let result = limiter.check("10.0.0.10").await.unwrap();
        assert!(result.allowed);
        assert_eq!(result.count, 1);
        assert_eq!(
            cache.calls(),
            [
                Call::Exists,
                Call::Get,
                Call::Incr,
                Call::Expire(Duration::from_secs(180))
            ]
        );
    }

    #[tokio::test]
    async fn test_live_counter_is_not_rearmed() {
        let cache = Arc::new(ScriptedCache::new(true, Some(2), 3));
        let limiter = RateLimiter::new(cache.clone(), RateLimitConfig::new(5, 180));

        assert!(limiter.check("10.0.0.11").await.unwrap().allowed);
        assert_eq!(cache.calls(), [Call::Exists, Call::Get, Call::Incr]);
    }
}
