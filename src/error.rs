//! Error taxonomy for the health server
//!
//! Probe failures are not errors here: they are reported in the `/healthz`
//! body. Only configuration and serving failures surface as `HealthzError`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HealthzError {
    #[error("required config option 'Log' not found")]
    MissingLogger,

    #[error("could not detect hostname: {0}")]
    Hostname(#[source] std::io::Error),

    #[error("failed to bind health server to {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("health server failed: {0}")]
    Serve(#[source] std::io::Error),
}
