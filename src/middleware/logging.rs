//! Logging middleware
//!
//! Records HTTP request and response information

use axum::{
    extract::Request,
    http::{Method, Uri},
    middleware::Next,
    response::Response,
};
use std::time::Instant;
use tracing::{info, Instrument};
use uuid::Uuid;

/// Request logging middleware
///
/// Assigns a request id and records latency for each HTTP request
pub async fn request_logging_middleware(
    method: Method,
    uri: Uri,
    request: Request,
    next: Next,
) -> Response {
    let start_time = Instant::now();
    let request_id = Uuid::new_v4();

    let span = tracing::info_span!(
        "http_request",
        request_id = %request_id,
        method = %method,
        path = %uri.path(),
    );

    let response = next.run(request).instrument(span).await;

    info!(
        "{} {} -> {} in {}ms [{}]",
        method,
        uri.path(),
        response.status(),
        start_time.elapsed().as_millis(),
        request_id
    );

    response
}
