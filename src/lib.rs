//! Health-check aggregation over HTTP
//!
//! Register named probes, then serve their combined result on `/healthz`
//! and a plain liveness answer on `/liveness`.
//!
//! ```no_run
//! use healthz::{Config, FnCheck, HealthChecker, ProviderInfo, TracingLogger};
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), healthz::HealthzError> {
//! let checker = HealthChecker::new(Config {
//!     bind_addr: "0.0.0.0".to_string(),
//!     bind_port: 8080,
//!     providers: vec![ProviderInfo::new(
//!         "Disk",
//!         "Ensure the data volume is mounted",
//!         FnCheck::new(|| Ok(())),
//!     )],
//!     log: Some(Arc::new(TracingLogger)),
//!     ..Config::default()
//! })?;
//! checker.start().await;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod logger;
pub mod probe;
pub mod server;

pub use error::HealthzError;
pub use logger::{Logger, TracingLogger};
pub use probe::{CheckError, FnCheck, HealthCheckable, ProviderInfo};
pub use server::{Config, HealthChecker, HttpResponse};
