//! Aggregate health and liveness endpoints
//!
//! - `/healthz` - Runs every registered probe and reports failures as JSON
//! - `/liveness` - Is the process alive and serving HTTP?
//!
//! `/healthz` answers 200 OK even when probes fail. Monitoring matches on
//! `"Errors":null` in the body and would lose the error text on a 5xx.

use super::limits::{self, MAX_HEADER_BYTES, REQUEST_TIMEOUT};
use crate::error::HealthzError;
use crate::logger::{Logger, TracingLogger};
use crate::probe::{run_checks, CheckError, ProviderInfo};
use axum::{
    extract::State,
    http::{header::CONTENT_TYPE, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use hyper_util::rt::TokioTimer;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinError;

/// Construction options for [`HealthChecker`]
#[derive(Clone, Default)]
pub struct Config {
    pub bind_port: u16,
    pub bind_addr: String,
    /// Probes in the order they are evaluated and reported
    pub providers: Vec<ProviderInfo>,
    /// Reported in every `/healthz` body; autodetected when empty
    pub hostname: String,
    /// Application logger (required)
    pub log: Option<Arc<dyn Logger>>,
    /// Logger for the HTTP server's own errors; defaults to `TracingLogger`
    pub server_error_log: Option<Arc<dyn Logger>>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("bind_port", &self.bind_port)
            .field("bind_addr", &self.bind_addr)
            .field("providers", &self.providers)
            .field("hostname", &self.hostname)
            .field("log", &self.log.is_some())
            .field("server_error_log", &self.server_error_log.is_some())
            .finish()
    }
}

/// JSON body of `/healthz`
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct HttpResponse {
    /// `None` (serialized as `null`) when every probe passed
    pub errors: Option<Vec<CheckError>>,
    pub hostname: String,
}

/// State shared by the handlers; never mutated after construction
#[derive(Clone)]
struct HealthState {
    providers: Arc<[ProviderInfo]>,
    hostname: Arc<str>,
    log: Arc<dyn Logger>,
}

/// Health server: a fixed probe list, a hostname, and the router serving them
///
/// Constructing it does not open a socket. Call [`HealthChecker::start`]
/// (usually in its own task) to begin serving.
pub struct HealthChecker {
    addr: String,
    hostname: String,
    router: Router,
    log: Arc<dyn Logger>,
}

impl HealthChecker {
    /// Validate the config, resolve the hostname and build the router
    ///
    /// # Errors
    /// * `HealthzError::MissingLogger` - `config.log` is `None`
    /// * `HealthzError::Hostname` - no hostname given and autodetection failed
    pub fn new(config: Config) -> Result<Self, HealthzError> {
        let log = config.log.ok_or(HealthzError::MissingLogger)?;

        // Reported in check results so we can tell which pod the check ran on
        let hostname = if config.hostname.is_empty() {
            let detected = hostname::get()
                .map_err(HealthzError::Hostname)?
                .to_string_lossy()
                .into_owned();
            log.info(format_args!("autodetected hostname as: {}", detected));
            detected
        } else {
            config.hostname
        };

        let server_error_log = config
            .server_error_log
            .unwrap_or_else(|| Arc::new(TracingLogger));

        let state = HealthState {
            providers: config.providers.into(),
            hostname: hostname.as_str().into(),
            log: log.clone(),
        };

        Ok(Self {
            addr: format!("{}:{}", config.bind_addr, config.bind_port),
            hostname,
            router: build_router(state, server_error_log),
            log,
        })
    }

    /// `bind_addr:bind_port` as configured
    pub fn addr(&self) -> &str {
        &self.addr
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// The router serving `/healthz` and `/liveness`, with limits applied
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Bind and serve until the server fails
    ///
    /// Host names in `bind_addr` are resolved by the OS.
    ///
    /// # Errors
    /// * `HealthzError::Bind` - the address could not be bound
    /// * `HealthzError::Serve` - the accept loop failed
    pub async fn serve(&self) -> Result<(), HealthzError> {
        self.serve_with(REQUEST_TIMEOUT).await
    }

    /// Serve with a custom limit on reading each request head
    pub(crate) async fn serve_with(
        &self,
        header_read_timeout: Duration,
    ) -> Result<(), HealthzError> {
        let bind_err = |source: std::io::Error| HealthzError::Bind {
            addr: self.addr.clone(),
            source,
        };

        let listener = std::net::TcpListener::bind(self.addr.as_str()).map_err(bind_err)?;
        listener.set_nonblocking(true).map_err(bind_err)?;

        let mut server = axum_server::from_tcp(listener);
        // Slow or idle clients are dropped once the head takes too long
        server
            .http_builder()
            .http1()
            .max_buf_size(MAX_HEADER_BYTES)
            .timer(TokioTimer::new())
            .header_read_timeout(header_read_timeout);

        // Log after successful bind - server is actually listening
        self.log
            .info(format_args!("healthz server listening on {}", self.addr));

        server
            .serve(self.router().into_make_service())
            .await
            .map_err(HealthzError::Serve)
    }

    /// Serve until the server fails, logging the failure
    ///
    /// Runs forever under normal operation; spawn it in its own task.
    /// There is no restart: the process supervisor owns that policy.
    pub async fn start(&self) {
        self.log.debug(format_args!("Starting healthz server"));
        if let Err(e) = self.serve().await {
            self.log.error(format_args!("{}", e));
        }
    }
}

/// Build the router for the health endpoints
fn build_router(state: HealthState, server_error_log: Arc<dyn Logger>) -> Router {
    let router = Router::new()
        .route("/healthz", any(handle_healthz))
        .route("/liveness", any(handle_liveness))
        .with_state(state);

    limits::apply(router, REQUEST_TIMEOUT, server_error_log)
}

/// Aggregate health handler
///
/// Probes run on the blocking pool, one after another, in registration order.
async fn handle_healthz(State(state): State<HealthState>) -> Response {
    let providers = state.providers.clone();
    let outcome = tokio::task::spawn_blocking(move || run_checks(&providers)).await;
    respond(state.log.as_ref(), &state.hostname, outcome)
}

/// Turn one evaluation into the `/healthz` response
///
/// The status is 200 on every path. When the checks did not complete or the
/// report cannot be encoded, the body is empty and the cause is logged.
pub(super) fn respond(
    log: &dyn Logger,
    hostname: &str,
    outcome: Result<Vec<CheckError>, JoinError>,
) -> Response {
    let body = match outcome {
        Ok(errors) => report_body(log, hostname, errors),
        Err(e) => {
            log.error(format_args!("health checks did not complete: {}", e));
            Vec::new()
        }
    };

    (StatusCode::OK, [(CONTENT_TYPE, "application/json")], body).into_response()
}

fn report_body(log: &dyn Logger, hostname: &str, errors: Vec<CheckError>) -> Vec<u8> {
    if errors.is_empty() {
        log.debug(format_args!("All checks passed"));
    } else {
        for e in &errors {
            log.errorf(format_args!(
                "Check failed: {}: {}, error: {}",
                e.check_type, e.description, e.err_msg
            ));
        }
    }

    let report = HttpResponse {
        errors: (!errors.is_empty()).then_some(errors),
        hostname: hostname.to_string(),
    };

    match encode_report(&report) {
        Ok(body) => body,
        Err(e) => {
            log.error(format_args!("{}", e));
            Vec::new()
        }
    }
}

/// Liveness handler
///
/// Always returns 200 OK - if this responds, the process is alive.
async fn handle_liveness(State(state): State<HealthState>) -> &'static str {
    state.log.debug(format_args!("Liveness check: OK"));
    "OK"
}

/// Encode a report as a single JSON line
fn encode_report(report: &HttpResponse) -> serde_json::Result<Vec<u8>> {
    let mut body = serde_json::to_vec(report)?;
    body.push(b'\n');
    Ok(body)
}
