//! Rate Limit Middleware
//!
//! Applied router-wide with `axum::middleware::from_fn_with_state`, so the quota
//! is shared by every route.

use crate::cache::CounterCache;
use crate::client::extract_client_ip;
use crate::rate_limit::RateLimiter;
use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;
use kernel::error::app_error::AppError;
use std::net::SocketAddr;

/// Middleware state
pub struct RateLimitState<C> {
    pub limiter: RateLimiter<C>,
    pub trust_forwarded_for: bool,
}

impl<C> Clone for RateLimitState<C> {
    fn clone(&self) -> Self {
        Self {
            limiter: self.limiter.clone(),
            trust_forwarded_for: self.trust_forwarded_for,
        }
    }
}

/// Reject the request with 429 once the client's quota is spent.
///
/// Fails closed: if the client cannot be identified or the cache errors, the
/// request is rejected with a server error instead of being admitted.
pub async fn rate_limit<C>(
    State(state): State<RateLimitState<C>>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError>
where
    C: CounterCache + Send + Sync + 'static,
{
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0);

    let Some(identity) = extract_client_ip(req.headers(), peer, state.trust_forwarded_for)
    else {
        tracing::error!("Rate limiter could not determine client address");
        return Err(AppError::internal("Unable to identify client"));
    };

    let result = match state.limiter.check(&identity).await {
        Ok(result) => result,
        Err(e) => {
            tracing::error!(error = %e, client = %identity, "Rate limiter cache failure");
            return Err(AppError::internal("Rate limiter unavailable")
                .with_action("Please retry later")
                .with_source(e));
        }
    };

    if !result.allowed {
        tracing::warn!(
            client = %identity,
            count = result.count,
            max = state.limiter.config().max_requests,
            "Rate limit exceeded"
        );
        // The full window is an upper bound on the counter's remaining TTL.
        return Err(AppError::too_many_requests("rate limit exceeded")
            .with_retry_after(state.limiter.config().window));
    }

    Ok(next.run(req).await)
}
