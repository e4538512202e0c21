//! Counter Cache
//!
//! Minimal key-value surface needed by the rate limiter: existence check,
//! integer get/set with expiry, atomic increment and re-arming a TTL.

pub mod memory;
pub mod redis;

pub use self::memory::InMemoryCounterCache;
pub use self::redis::RedisCounterCache;

use std::time::Duration;
use thiserror::Error;

pub type CacheResult<T> = Result<T, CacheError>;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache backend error: {0}")]
    Backend(#[from] ::redis::RedisError),

    #[error("Cache operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Cache value for {key} is not a valid integer counter")]
    InvalidValue { key: String },
}

/// Counter storage used by the rate limiter.
///
/// All operations are single round trips. Implementations must not hold any
/// lock across an `.await` of the caller.
#[trait_variant::make(CounterCache: Send)]
pub trait LocalCounterCache {
    /// Whether `key` exists and has not expired.
    async fn exists(&self, key: &str) -> CacheResult<bool>;

    /// Current integer value, `None` if absent.
    async fn get_integer(&self, key: &str) -> CacheResult<Option<i64>>;

    /// Store `value` under `key`, expiring after `ttl`.
    async fn set_integer(&self, key: &str, value: i64, ttl: Duration) -> CacheResult<()>;

    /// Atomically add one and return the new value. A missing key starts at 0
    /// and gets no expiry.
    async fn increment(&self, key: &str) -> CacheResult<i64>;

    /// Set the expiry of an existing key. Returns false if the key is absent.
    async fn expire(&self, key: &str, ttl: Duration) -> CacheResult<bool>;
}

/// Millisecond TTL for the wire, never zero (`PX 0` is rejected by Redis).
pub(crate) fn ttl_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}
