//! Router composition
//!
//! Layer order, outermost first: CORS, trace, timeout, then the rate limiter,
//! which wraps every books route. `/healthz` sits outside the limiter.

use axum::http::{HeaderValue, Method, StatusCode, header};
use axum::routing::get;
use axum::{Json, Router, middleware};
use platform::cache::CounterCache;
use platform::middleware::{RateLimitState, rate_limit};
use serde::Serialize;
use std::time::Duration;
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

#[derive(Serialize)]
struct Health {
    status: &'static str,
}

async fn healthz() -> Json<Health> {
    Json(Health { status: "ok" })
}

pub fn cors_layer(frontend_origins: &[String]) -> CorsLayer {
    let allowed_origins: Vec<HeaderValue> = frontend_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods(AllowMethods::list([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ]))
        .allow_headers(AllowHeaders::list([header::CONTENT_TYPE, header::ACCEPT]))
}

/// Wrap the books routes with the shared middleware stack.
pub fn build_app<C>(
    books: Router,
    limit: RateLimitState<C>,
    cors: CorsLayer,
    request_timeout: Duration,
) -> Router
where
    C: CounterCache + Send + Sync + 'static,
{
    Router::new()
        .merge(books)
        .layer(middleware::from_fn_with_state(limit, rate_limit::<C>))
        .route("/healthz", get(healthz))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
