//! Test double for [`HealthReporter`] that records lifecycle events.

use std::sync::Mutex;

use kmo_batch_config::Config;

use crate::bootstrap::BootstrapError;
use crate::event_loop::EventLoopError;
use crate::health::HealthReporter;
use crate::transport::ListenerError;

/// Structured health events tracked during scenarios.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HealthEvent {
    BootstrapStarting,
    BootstrapSucceeded,
    BootstrapFailed(String),
    ListenerReady,
    ListenerFailed(String),
    EventLoopStopped { failed: bool },
}

/// Records health events for assertions.
#[derive(Debug, Default)]
pub struct RecordingHealthReporter {
    events: Mutex<Vec<HealthEvent>>,
}

impl RecordingHealthReporter {
    /// Captures a copy of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<HealthEvent> {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .clone()
    }

    fn record(&self, event: HealthEvent) {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .push(event);
    }
}

impl HealthReporter for RecordingHealthReporter {
    fn bootstrap_starting(&self) {
        self.record(HealthEvent::BootstrapStarting);
    }

    fn bootstrap_succeeded(&self, _config: &Config) {
        self.record(HealthEvent::BootstrapSucceeded);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        self.record(HealthEvent::BootstrapFailed(error.to_string()));
    }

    fn listener_ready(&self, _config: &Config) {
        self.record(HealthEvent::ListenerReady);
    }

    fn listener_failed(&self, error: &ListenerError) {
        self.record(HealthEvent::ListenerFailed(error.to_string()));
    }

    fn event_loop_stopped(&self, error: Option<&EventLoopError>) {
        self.record(HealthEvent::EventLoopStopped {
            failed: error.is_some(),
        });
    }
}
