//! Structured health reporting for daemon lifecycle events.

use std::sync::Arc;

use kmo_batch_config::Config;

use crate::bootstrap::BootstrapError;
use crate::event_loop::EventLoopError;
use crate::transport::ListenerError;

const HEALTH_TARGET: &str = "kmo_batchd::health";

/// Observer trait used to surface lifecycle events to telemetry sinks.
pub trait HealthReporter: Send + Sync {
    /// Invoked before configuration loading begins.
    fn bootstrap_starting(&self);

    /// Invoked after bootstrap completes successfully.
    fn bootstrap_succeeded(&self, config: &Config);

    /// Invoked when bootstrap fails.
    fn bootstrap_failed(&self, error: &BootstrapError);

    /// Invoked once the socket is bound and connections are accepted.
    fn listener_ready(&self, config: &Config);

    /// Invoked when the socket cannot be bound.
    fn listener_failed(&self, error: &ListenerError);

    /// Invoked when the event loop returns, with its error if it failed.
    fn event_loop_stopped(&self, error: Option<&EventLoopError>);
}

impl<T> HealthReporter for Arc<T>
where
    T: HealthReporter,
{
    fn bootstrap_starting(&self) {
        (**self).bootstrap_starting();
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        (**self).bootstrap_succeeded(config);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        (**self).bootstrap_failed(error);
    }

    fn listener_ready(&self, config: &Config) {
        (**self).listener_ready(config);
    }

    fn listener_failed(&self, error: &ListenerError) {
        (**self).listener_failed(error);
    }

    fn event_loop_stopped(&self, error: Option<&EventLoopError>) {
        (**self).event_loop_stopped(error);
    }
}

/// Default reporter that records lifecycle events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredHealthReporter;

impl StructuredHealthReporter {
    /// Builds a new reporter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl HealthReporter for StructuredHealthReporter {
    fn bootstrap_starting(&self) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_starting",
            "starting daemon bootstrap"
        );
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_succeeded",
            socket = %config.daemon_socket(),
            max_jobs = config.max_jobs().get(),
            log_filter = %config.log_filter(),
            log_format = %config.log_format(),
            "daemon bootstrap completed"
        );
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "bootstrap_failed",
            error = %error,
            "daemon bootstrap failed"
        );
    }

    fn listener_ready(&self, config: &Config) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "listener_ready",
            socket = %config.daemon_socket(),
            max_jobs = config.max_jobs().get(),
            "daemon ready for submissions"
        );
    }

    fn listener_failed(&self, error: &ListenerError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "listener_failed",
            error = %error,
            "daemon socket could not be bound"
        );
    }

    fn event_loop_stopped(&self, error: Option<&EventLoopError>) {
        match error {
            None => tracing::info!(
                target: HEALTH_TARGET,
                event = "event_loop_stopped",
                "daemon stopped"
            ),
            Some(error) => tracing::error!(
                target: HEALTH_TARGET,
                event = "event_loop_failed",
                error = %error,
                "daemon event loop failed"
            ),
        }
    }
}
