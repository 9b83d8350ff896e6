use axum::{
    extract::{MatchedPath, Request},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Requests slower than this are logged at warn level.
const SLOW_REQUEST: Duration = Duration::from_secs(10);

/// Logs one `metrics` line per request, labelled by route template so entry ids
/// do not fan out into separate series.
pub async fn metrics_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());

    let response = next.run(req).await;

    let latency = start.elapsed();
    let status = response.status();
    let class = status_class(status);

    if status.is_server_error() || latency >= SLOW_REQUEST {
        warn!(
            target: "metrics",
            method = %method,
            route = %route,
            status = status.as_u16(),
            class,
            latency_ms = latency.as_millis() as u64,
            "request_completed"
        );
    } else {
        info!(
            target: "metrics",
            method = %method,
            route = %route,
            status = status.as_u16(),
            class,
            latency_ms = latency.as_millis() as u64,
            "request_completed"
        );
    }

    response
}

fn status_class(status: StatusCode) -> &'static str {
    match status.as_u16() {
        100..=199 => "1xx",
        200..=299 => "2xx",
        300..=399 => "3xx",
        400..=499 => "4xx",
        _ => "5xx",
    }
}
