//! Request limits enforced by the health server
//!
//! - Each request must complete within `REQUEST_TIMEOUT` (408 otherwise)
//! - The request header block may not exceed `MAX_HEADER_BYTES` (431 otherwise)
//!
//! Rejections are reported to the server-error logger, which is separate
//! from the application logger that receives check results.

use crate::logger::Logger;
use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::timeout::TimeoutLayer;

/// Upper bound for reading a request and writing its response
///
/// Also bounds time spent waiting for a request head on a connection, idle
/// keep-alive included. Probe time counts against it too: a `/healthz`
/// whose checks run longer than this gets a 408 instead of the report.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(45);

/// Largest accepted request header block, in bytes (1 MiB)
pub const MAX_HEADER_BYTES: usize = 1 << 20;

/// Wrap a router with the timeout and header-size limits
pub(crate) fn apply(
    router: Router,
    timeout: Duration,
    server_error_log: Arc<dyn Logger>,
) -> Router {
    router
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            timeout,
        ))
        // Outermost so oversized requests never reach the timeout or handlers
        .layer(middleware::from_fn_with_state(
            ServerErrorLog {
                log: server_error_log,
                timeout,
            },
            enforce_limits,
        ))
}

#[derive(Clone)]
struct ServerErrorLog {
    log: Arc<dyn Logger>,
    timeout: Duration,
}

async fn enforce_limits(
    State(server): State<ServerErrorLog>,
    request: Request,
    next: Next,
) -> Response {
    let header_bytes = header_block_len(request.headers());
    if header_bytes > MAX_HEADER_BYTES {
        server.log.error(format_args!(
            "http: request header block of {} bytes exceeds limit of {} bytes",
            header_bytes, MAX_HEADER_BYTES
        ));
        return StatusCode::REQUEST_HEADER_FIELDS_TOO_LARGE.into_response();
    }

    let method = request.method().clone();
    let uri = request.uri().clone();
    let response = next.run(request).await;

    if response.status() == StatusCode::REQUEST_TIMEOUT {
        server.log.error(format_args!(
            "http: {} {} timed out after {:?}",
            method, uri, server.timeout
        ));
    }
    response
}

/// Size of the headers as they appear on the wire (`name: value\r\n`)
pub(crate) fn header_block_len(headers: &HeaderMap) -> usize {
    headers
        .iter()
        .map(|(name, value)| name.as_str().len() + value.len() + 4)
        .sum()
}
