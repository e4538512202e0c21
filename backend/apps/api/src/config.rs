//! Application Configuration
//!
//! Read once at startup from environment variables (after `.env` is loaded).
//! Every value except `DATABASE_URL` has a default; a malformed value is a
//! startup error naming the variable.

use anyhow::{Context, bail};
use books::DeleteMode;
use platform::rate_limit::{RateLimitConfig, RateLimitStrategy};
use std::fmt::Display;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

/// Which counter cache backs the rate limiter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheBackend {
    Redis,
    /// Process-local; only correct for a single replica
    Memory,
}

impl FromStr for CacheBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "redis" => Ok(Self::Redis),
            "memory" | "in_memory" => Ok(Self::Memory),
            other => Err(format!("unknown cache backend: {other}")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
    pub max_lifetime: Duration,
    pub connect_attempts: u32,
    pub connect_retry_delay: Duration,
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub backend: CacheBackend,
    pub redis_url: String,
    pub op_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub addr: SocketAddr,
    pub database: DatabaseConfig,
    pub cache: CacheConfig,
    pub rate_limit: RateLimitConfig,
    pub trust_forwarded_for: bool,
    pub delete_mode: DeleteMode,
    pub request_timeout: Duration,
    pub shutdown_grace: Duration,
    pub frontend_origins: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let env = Env(lookup);

        let host: IpAddr = env.parse_or("SERVER_HOST", IpAddr::from([0, 0, 0, 0]))?;
        let port: u16 = env.parse_or("SERVER_PORT", 8080)?;

        let database = DatabaseConfig {
            url: env
                .get("DATABASE_URL")
                .context("DATABASE_URL must be set in environment")?,
            max_connections: env.parse_or("DB_MAX_CONNECTIONS", 10)?,
            min_connections: env.parse_or("DB_MIN_CONNECTIONS", 2)?,
            acquire_timeout: Duration::from_secs(env.parse_or("DB_ACQUIRE_TIMEOUT_SECS", 5)?),
            max_lifetime: Duration::from_secs(env.parse_or("DB_MAX_LIFETIME_SECS", 300)?),
            connect_attempts: env.parse_or("DB_CONNECT_ATTEMPTS", 4)?,
            connect_retry_delay: Duration::from_secs(
                env.parse_or("DB_CONNECT_RETRY_DELAY_SECS", 2)?,
            ),
        };
        if database.min_connections > database.max_connections {
            bail!("DB_MIN_CONNECTIONS must not exceed DB_MAX_CONNECTIONS");
        }
        if database.connect_attempts == 0 {
            bail!("DB_CONNECT_ATTEMPTS must be at least 1");
        }

        let cache = CacheConfig {
            backend: env.parse_or("CACHE_BACKEND", CacheBackend::Redis)?,
            redis_url: env
                .get("REDIS_URL")
                .unwrap_or_else(|| "redis://127.0.0.1:6379".to_string()),
            op_timeout: Duration::from_millis(env.parse_or("CACHE_OP_TIMEOUT_MS", 5000)?),
        };

        let max_requests: u32 = env.parse_or("RATE_LIMIT_MAX_REQUESTS", 5)?;
        let window_secs: u64 = env.parse_or("RATE_LIMIT_WINDOW_SECS", 180)?;
        if max_requests == 0 {
            bail!("RATE_LIMIT_MAX_REQUESTS must be greater than zero");
        }
        if window_secs == 0 {
            bail!("RATE_LIMIT_WINDOW_SECS must be greater than zero");
        }
        let rate_limit = RateLimitConfig::new(max_requests, window_secs).with_strategy(
            env.parse_or("RATE_LIMIT_STRATEGY", RateLimitStrategy::default())?,
        );

        let frontend_origins = env
            .get("FRONTEND_ORIGINS")
            .unwrap_or_else(|| "http://localhost:3000".to_string())
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(String::from)
            .collect();

        Ok(Self {
            addr: SocketAddr::new(host, port),
            database,
            cache,
            rate_limit,
            trust_forwarded_for: env.parse_or("TRUST_FORWARDED_FOR", false)?,
            delete_mode: env.parse_or("BOOKS_DELETE_MODE", DeleteMode::default())?,
            request_timeout: Duration::from_secs(env.parse_or("REQUEST_TIMEOUT_SECS", 30)?),
            shutdown_grace: Duration::from_secs(env.parse_or("SHUTDOWN_GRACE_SECS", 10)?),
            frontend_origins,
        })
    }
}

struct Env<F>(F);

impl<F: Fn(&str) -> Option<String>> Env<F> {
    /// Non-blank value of `key`
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    fn parse_or<T>(&self, key: &str, default: T) -> anyhow::Result<T>
    where
        T: FromStr,
        T::Err: Display,
    {
        match self.get(key) {
            None => Ok(default),
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|e| anyhow::anyhow!("invalid {key}={raw:?}: {e}")),
        }
    }
}
