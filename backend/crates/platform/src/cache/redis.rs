//! Redis Counter Cache

use super::{CacheError, CacheResult, CounterCache, ttl_millis};
use redis::aio::ConnectionManager;
use std::future::Future;
use std::time::Duration;

/// Redis-backed counter cache.
///
/// `ConnectionManager` multiplexes one connection and reconnects on failure,
/// so clones are cheap and share the same socket.
#[derive(Clone)]
pub struct RedisCounterCache {
    conn: ConnectionManager,
    op_timeout: Duration,
}

impl RedisCounterCache {
    /// Connect and verify the server answers `PING` within `op_timeout`.
    pub async fn connect(url: &str, op_timeout: Duration) -> CacheResult<Self> {
        let client = redis::Client::open(url)?;

        let conn = tokio::time::timeout(op_timeout, ConnectionManager::new(client))
            .await
            .map_err(|_| CacheError::Timeout(op_timeout))??;

        let cache = Self { conn, op_timeout };
        cache.ping().await?;

        tracing::info!(timeout_ms = op_timeout.as_millis() as u64, "Connected to Redis");
        Ok(cache)
    }

    pub async fn ping(&self) -> CacheResult<()> {
        let mut conn = self.conn.clone();
        let _: String = self
            .bounded(redis::cmd("PING").query_async(&mut conn))
            .await?;
        Ok(())
    }

    /// Apply the per-operation deadline. Dropping the inner future on timeout
    /// abandons the reply; the manager discards it when it arrives.
    async fn bounded<T, F>(&self, op: F) -> CacheResult<T>
    where
        F: Future<Output = redis::RedisResult<T>>,
    {
        match tokio::time::timeout(self.op_timeout, op).await {
            Ok(result) => result.map_err(CacheError::from),
            Err(_) => {
                tracing::warn!(
                    timeout_ms = self.op_timeout.as_millis() as u64,
                    "Redis operation timed out"
                );
                Err(CacheError::Timeout(self.op_timeout))
            }
        }
    }
}

impl CounterCache for RedisCounterCache {
    async fn exists(&self, key: &str) -> CacheResult<bool> {
        let mut conn = self.conn.clone();
        self.bounded(redis::cmd("EXISTS").arg(key).query_async(&mut conn))
            .await
    }

    async fn get_integer(&self, key: &str) -> CacheResult<Option<i64>> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = self
            .bounded(redis::cmd("GET").arg(key).query_async(&mut conn))
            .await?;

        raw.map(|value| {
            value.trim().parse::<i64>().map_err(|_| CacheError::InvalidValue {
                key: key.to_string(),
            })
        })
        .transpose()
    }

    async fn set_integer(&self, key: &str, value: i64, ttl: Duration) -> CacheResult<()> {
        let mut conn = self.conn.clone();
        self.bounded(
            redis::cmd("SET")
                .arg(key)
                .arg(value)
                .arg("PX")
                .arg(ttl_millis(ttl))
                .query_async::<()>(&mut conn),
        )
        .await
    }

    async fn increment(&self, key: &str) -> CacheResult<i64> {
        let mut conn = self.conn.clone();
        self.bounded(redis::cmd("INCR").arg(key).query_async(&mut conn))
            .await
    }

    async fn expire(&self, key: &str, ttl: Duration) -> CacheResult<bool> {
        let mut conn = self.conn.clone();
        self.bounded(
            redis::cmd("PEXPIRE")
                .arg(key)
                .arg(ttl_millis(ttl))
                .query_async(&mut conn),
        )
        .await
    }
}
