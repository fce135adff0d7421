//! Health probes and their evaluation
//!
//! A probe is anything implementing `HealthCheckable`. Probes are registered
//! once as `ProviderInfo` entries and evaluated in registration order on
//! every `/healthz` request.

use serde::Serialize;
use std::any::Any;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// A single health probe
///
/// Returning `Err` marks the probe as failing; the error's `Display` text
/// becomes the `ErrMsg` reported to monitoring.
pub trait HealthCheckable: Send + Sync {
    fn health_z(&self) -> anyhow::Result<()>;
}

/// Adapter that turns a closure into a probe
///
/// ```
/// use healthz::{FnCheck, ProviderInfo};
///
/// let provider = ProviderInfo::new(
///     "Disk",
///     "Ensure the data volume is mounted",
///     FnCheck::new(|| Ok(())),
/// );
/// assert_eq!(provider.check_type(), "Disk");
/// ```
pub struct FnCheck<F> {
    check: F,
}

impl<F> FnCheck<F>
where
    F: Fn() -> anyhow::Result<()> + Send + Sync,
{
    pub fn new(check: F) -> Self {
        Self { check }
    }
}

impl<F> HealthCheckable for FnCheck<F>
where
    F: Fn() -> anyhow::Result<()> + Send + Sync,
{
    fn health_z(&self) -> anyhow::Result<()> {
        (self.check)()
    }
}

/// A registered probe with the labels reported when it fails
///
/// Neither label has to be unique.
#[derive(Clone)]
pub struct ProviderInfo {
    check: Arc<dyn HealthCheckable>,
    description: String,
    check_type: String,
}

impl ProviderInfo {
    pub fn new(
        check_type: impl Into<String>,
        description: impl Into<String>,
        check: impl HealthCheckable + 'static,
    ) -> Self {
        Self::from_arc(check_type, description, Arc::new(check))
    }

    /// Register a probe that is shared with other parts of the process
    pub fn from_arc(
        check_type: impl Into<String>,
        description: impl Into<String>,
        check: Arc<dyn HealthCheckable>,
    ) -> Self {
        Self {
            check,
            description: description.into(),
            check_type: check_type.into(),
        }
    }

    pub fn check_type(&self) -> &str {
        &self.check_type
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Run the probe, converting a panic into a failure
    fn evaluate(&self) -> Result<(), String> {
        match catch_unwind(AssertUnwindSafe(|| self.check.health_z())) {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(e.to_string()),
            Err(payload) => Err(format!("check panicked: {}", panic_message(&*payload))),
        }
    }
}

impl fmt::Debug for ProviderInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderInfo")
            .field("description", &self.description)
            .field("check_type", &self.check_type)
            .finish_non_exhaustive()
    }
}

/// One failing probe in a `/healthz` report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckError {
    #[serde(rename = "Type")]
    pub check_type: String,
    #[serde(rename = "ErrMsg")]
    pub err_msg: String,
    #[serde(rename = "Description")]
    pub description: String,
}

/// Evaluate every provider in order, returning the failures in that order
///
/// Probes run sequentially on the calling thread with no deadline.
pub fn run_checks(providers: &[ProviderInfo]) -> Vec<CheckError> {
    providers
        .iter()
        .filter_map(|provider| {
            provider.evaluate().err().map(|err_msg| CheckError {
                check_type: provider.check_type.clone(),
                err_msg,
                description: provider.description.clone(),
            })
        })
        .collect()
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}

#[cfg(test)]
#[path = "probe_test.rs"]
mod tests;
