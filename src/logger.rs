//! Logging capability handed to the health server
//!
//! Callers bring their own logger. `TracingLogger` forwards to `tracing`
//! and is what the binary uses.

use std::fmt;

/// Leveled logger used by the health server
///
/// Messages arrive pre-formatted as `fmt::Arguments`, so call sites read
/// like `log.info(format_args!("autodetected hostname as: {}", host))`.
pub trait Logger: Send + Sync {
    fn info(&self, args: fmt::Arguments<'_>);

    fn debug(&self, args: fmt::Arguments<'_>);

    fn error(&self, args: fmt::Arguments<'_>);

    /// Error with a format string, used for per-check failure lines
    fn errorf(&self, args: fmt::Arguments<'_>) {
        self.error(args)
    }
}

/// Logger that delegates to the `tracing` macros
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn info(&self, args: fmt::Arguments<'_>) {
        tracing::info!("{}", args);
    }

    fn debug(&self, args: fmt::Arguments<'_>) {
        tracing::debug!("{}", args);
    }

    fn error(&self, args: fmt::Arguments<'_>) {
        tracing::error!("{}", args);
    }
}
