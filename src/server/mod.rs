//! HTTP server for health endpoints
//!
//! Provides monitoring and orchestration probes:
//! - `/healthz` - Aggregate result of the registered health checks
//! - `/liveness` - Liveness probe (process is running)

mod health;
mod limits;

pub use health::{Config, HealthChecker, HttpResponse};
pub use limits::{MAX_HEADER_BYTES, REQUEST_TIMEOUT};

#[cfg(test)]
#[path = "health_test.rs"]
mod health_tests;

#[cfg(test)]
#[path = "limits_test.rs"]
mod limits_tests;
