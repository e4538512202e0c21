//! API Server Entry Point
//!
//! Application entry point and server initialization.
//! Uses `anyhow` for startup errors, but application-level
//! errors should use `kernel::error::AppError`.

mod app;
mod config;

use anyhow::Context;
use books::{BooksConfig, PgBookRepository, books_router};
use config::{AppConfig, CacheBackend, DatabaseConfig};
use platform::cache::{CounterCache, InMemoryCounterCache, RedisCounterCache};
use platform::middleware::RateLimitState;
use platform::rate_limit::RateLimiter;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// Re-export unified error types for use in handlers
pub use kernel::error::{
    app_error::{AppError, AppResult},
    kind::ErrorKind,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "api=info,books=info,platform=info,tower_http=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env().context("invalid configuration")?;

    let pool = connect_database(&config.database).await?;
    tracing::info!("Connected to database");

    sqlx::migrate!("../../../database/migrations")
        .run(&pool)
        .await
        .context("failed to run migrations")?;
    tracing::info!("Migrations completed");

    let result = match config.cache.backend {
        CacheBackend::Redis => {
            let cache = RedisCounterCache::connect(&config.cache.redis_url, config.cache.op_timeout)
                .await
                .context("failed to connect to Redis")?;
            serve(&config, pool.clone(), cache).await
        }
        CacheBackend::Memory => {
            tracing::warn!("Using in-memory rate limit counters; quotas are per process");
            serve(&config, pool.clone(), InMemoryCounterCache::new()).await
        }
    };

    pool.close().await;
    tracing::info!("Database pool closed");

    result
}

/// Connect with a fixed number of attempts and a fixed delay between them.
async fn connect_database(cfg: &DatabaseConfig) -> anyhow::Result<PgPool> {
    let options = PgPoolOptions::new()
        .max_connections(cfg.max_connections)
        .min_connections(cfg.min_connections)
        .acquire_timeout(cfg.acquire_timeout)
        .max_lifetime(cfg.max_lifetime);

    let mut attempt = 1;
    loop {
        match options.clone().connect(&cfg.url).await {
            Ok(pool) => return Ok(pool),
            Err(e) if attempt < cfg.connect_attempts => {
                tracing::warn!(
                    attempt,
                    max_attempts = cfg.connect_attempts,
                    error = %e,
                    "Database connection failed, retrying"
                );
                tokio::time::sleep(cfg.connect_retry_delay).await;
                attempt += 1;
            }
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("failed to connect to database after {attempt} attempts")
                });
            }
        }
    }
}

/// Build the app over `cache` and serve until a shutdown signal.
///
/// The cache is dropped when this returns, after the listener has drained.
async fn serve<C>(config: &AppConfig, pool: PgPool, cache: C) -> anyhow::Result<()>
where
    C: CounterCache + Send + Sync + 'static,
{
    let limiter = RateLimiter::new(Arc::new(cache), config.rate_limit.clone());
    let books = books_router(
        PgBookRepository::new(pool),
        BooksConfig::default().with_delete_mode(config.delete_mode),
    );

    let app = app::build_app(
        books,
        RateLimitState {
            limiter,
            trust_forwarded_for: config.trust_forwarded_for,
        },
        app::cors_layer(&config.frontend_origins),
        config.request_timeout,
    );

    let listener = TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("failed to bind {}", config.addr))?;
    tracing::info!(
        addr = %config.addr,
        max_requests = config.rate_limit.max_requests,
        window_secs = config.rate_limit.window.as_secs(),
        delete_mode = ?config.delete_mode,
        "Listening"
    );

    let shutdown = CancellationToken::new();
    tokio::spawn(shutdown_signal(shutdown.clone()));

    let mut server = tokio::spawn(
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown.clone().cancelled_owned())
        .into_future(),
    );

    tokio::select! {
        res = &mut server => res??,
        _ = shutdown.cancelled() => {
            match tokio::time::timeout(config.shutdown_grace, &mut server).await {
                Ok(res) => res??,
                Err(_) => {
                    tracing::warn!(
                        grace_secs = config.shutdown_grace.as_secs(),
                        "Shutdown grace period elapsed, dropping open connections"
                    );
                    server.abort();
                }
            }
        }
    }

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Cancel `token` on Ctrl+C or SIGTERM.
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, initiating graceful shutdown"),
        _ = terminate => tracing::info!("Received SIGTERM, initiating graceful shutdown"),
    }

    token.cancel();
}
