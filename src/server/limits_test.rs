//! Tests for request limits

#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::limits::*;
use super::{Config, HealthChecker};
use crate::logger::recording::{Level, RecordingLogger};
use crate::logger::Logger;
use axum::body::Body;
use axum::http::{HeaderMap, HeaderValue, Request, StatusCode};
use axum::routing::get;
use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

fn checker_with_server_log() -> (HealthChecker, Arc<RecordingLogger>, Arc<RecordingLogger>) {
    let log = Arc::new(RecordingLogger::default());
    let server_log = Arc::new(RecordingLogger::default());
    let checker = HealthChecker::new(Config {
        hostname: "tester".to_string(),
        log: Some(log.clone() as Arc<dyn Logger>),
        server_error_log: Some(server_log.clone() as Arc<dyn Logger>),
        ..Config::default()
    })
    .unwrap();
    (checker, log, server_log)
}

#[test]
fn test_limit_constants() {
    assert_eq!(REQUEST_TIMEOUT, Duration::from_secs(45));
    assert_eq!(MAX_HEADER_BYTES, 1024 * 1024);
}

#[test]
fn test_header_block_len_counts_wire_bytes() {
    let mut headers = HeaderMap::new();
    assert_eq!(header_block_len(&headers), 0);

    headers.insert("host", HeaderValue::from_static("localhost"));
    // "host: localhost\r\n"
    assert_eq!(header_block_len(&headers), 17);

    headers.append("x-a", HeaderValue::from_static("1"));
    headers.append("x-a", HeaderValue::from_static("22"));
    assert_eq!(header_block_len(&headers), 17 + 8 + 9);
}

/// Test: Oversized headers are rejected with 431 and reported to the server-error log
#[tokio::test]
async fn test_oversized_headers_rejected() {
    let (checker, log, server_log) = checker_with_server_log();

    let request = Request::builder()
        .uri("/healthz")
        .header("x-padding", "a".repeat(MAX_HEADER_BYTES))
        .body(Body::empty())
        .unwrap();
    let response = checker.router().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::REQUEST_HEADER_FIELDS_TOO_LARGE);

    let errors = server_log.at(Level::Error);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("exceeds limit of 1048576 bytes"));

    // Rejected before the handler, so the application log stays quiet
    assert!(log.lines().is_empty());
}

/// Test: Headers under the limit pass through untouched
#[tokio::test]
async fn test_headers_within_limit_pass() {
    let (checker, _log, server_log) = checker_with_server_log();

    let request = Request::builder()
        .uri("/liveness")
        .header("x-padding", "a".repeat(64 * 1024))
        .body(Body::empty())
        .unwrap();
    let response = checker.router().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(server_log.lines().is_empty());
}

/// Test: A request exceeding the timeout gets 408 and is reported
#[tokio::test]
async fn test_timeout_returns_408_and_logs() {
    let server_log = Arc::new(RecordingLogger::default());
    let router = Router::new().route(
        "/slow",
        get(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            "done"
        }),
    );
    let router = apply(router, Duration::from_millis(50), server_log.clone());

    let response = router
        .oneshot(Request::builder().uri("/slow").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
    let errors = server_log.at(Level::Error);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].starts_with("http: GET /slow timed out"));
}

/// Test: Server-error logger is optional
#[tokio::test]
async fn test_server_error_log_defaults() {
    let checker = HealthChecker::new(Config {
        hostname: "tester".to_string(),
        log: Some(Arc::new(RecordingLogger::default()) as Arc<dyn Logger>),
        ..Config::default()
    })
    .unwrap();

    let request = Request::builder()
        .uri("/healthz")
        .header("x-padding", "a".repeat(MAX_HEADER_BYTES))
        .body(Body::empty())
        .unwrap();
    let response = checker.router().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::REQUEST_HEADER_FIELDS_TOO_LARGE);
}
