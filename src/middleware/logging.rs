//! Request logging middleware.
//!
//! Logs every HTTP request with method, path, status code, and latency.

use axum::{body::Body, http::Request, middleware::Next, response::Response};
use std::time::Instant;
use tracing::{info, warn};

/// Middleware that logs HTTP requests with timing information.
///
/// Logs at INFO level for successful requests, WARN level for errors.
pub async fn request_logging(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let path = uri.path().to_string();

    // Skip logging for health checks to reduce noise
    if path == "/health" {
        return next.run(request).await;
    }

    let start = Instant::now();

    let response = next.run(request).await;

    let latency = start.elapsed();
    let status = response.status().as_u16();

    if status >= 500 {
        warn!(
            method = %method,
            path = %path,
            status = status,
            latency_ms = latency.as_millis(),
            "Request failed (5xx)"
        );
    } else {
        info!(
            method = %method,
            path = %path,
            status = status,
            latency_ms = latency.as_millis(),
            "Request completed"
        );
    }

    response
}
