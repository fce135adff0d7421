use anyhow::Context as _;
use healthz::{Config, HealthChecker, TracingLogger};
use std::sync::Arc;
use tracing::info;

/// Default address for the health endpoints
const DEFAULT_BIND_ADDR: &str = "0.0.0.0";

/// Default port for the health endpoints
const DEFAULT_PORT: u16 = 8080;

/// Build the server config from environment-style lookups
///
/// - `HEALTHZ_BIND_ADDR` (default: 0.0.0.0)
/// - `HEALTHZ_PORT` (default: 8080)
/// - `HEALTHZ_HOSTNAME` (default: autodetect)
fn config_from_env(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Config> {
    let bind_port = match var("HEALTHZ_PORT") {
        Some(port) => port
            .parse::<u16>()
            .with_context(|| format!("invalid HEALTHZ_PORT: {:?}", port))?,
        None => DEFAULT_PORT,
    };

    Ok(Config {
        bind_port,
        bind_addr: var("HEALTHZ_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
        hostname: var("HEALTHZ_HOSTNAME").unwrap_or_default(),
        log: Some(Arc::new(TracingLogger)),
        ..Config::default()
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = config_from_env(|key| std::env::var(key).ok())?;
    let checker = HealthChecker::new(config).context("failed to configure health server")?;

    info!(
        addr = %checker.addr(),
        hostname = %checker.hostname(),
        "Starting healthz"
    );

    // Serves until the listener fails; restart is left to the supervisor
    checker.start().await;
    Ok(())
}

#[cfg(test)]
#[path = "main_test.rs"]
mod tests;
