//! Failure Reporting
//!
//! Hook invoked when a logical request gives up. The default implementation
//! logs through `tracing`; hosts may plug in telemetry instead.

use std::error::Error;

use tracing::error;

/// Where a terminal failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailureContext<'a> {
    /// Component that gave up, e.g. `"API"`
    pub component: &'a str,
    /// Endpoint path that was requested
    pub endpoint: &'a str,
    /// Attempts made, including the initial one
    pub attempts: u32,
}

// == Failure Reporter ==
pub trait FailureReporter: Send + Sync {
    /// Called once per logical request, with the last attempt's error.
    fn report(&self, error: &(dyn Error + 'static), context: &FailureContext<'_>);
}

/// Logs terminal failures at `error` level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl FailureReporter for TracingReporter {
    fn report(&self, error: &(dyn Error + 'static), context: &FailureContext<'_>) {
        error!(
            component = context.component,
            endpoint = context.endpoint,
            attempts = context.attempts,
            error = %error,
            "{}: request failed",
            context.component
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AttemptError;
    use std::time::Duration;

    #[test]
    fn test_tracing_reporter_accepts_attempt_errors() {
        let error = AttemptError::Timeout(Duration::from_secs(10));
        let context = FailureContext {
            component: "API",
            endpoint: "/market",
            attempts: 4,
        };

        TracingReporter.report(&error, &context);
    }
}
