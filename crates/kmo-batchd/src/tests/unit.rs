//! Unit tests for the daemon bootstrap utilities.

use std::sync::Arc;

use rstest::rstest;

use crate::bootstrap::{BootstrapError, StaticConfigLoader, bootstrap_with};

use super::support::{FailingConfigLoader, HealthEvent, RecordingHealthReporter, TestConfigLoader};

#[rstest]
fn bootstrap_reports_start_and_success() {
    let loader = TestConfigLoader::new().with_max_jobs(3);
    let reporter = Arc::new(RecordingHealthReporter::default());

    let daemon = bootstrap_with(&loader, reporter.clone()).expect("bootstrap should succeed");

    assert_eq!(daemon.config().max_jobs().get(), 3);
    assert_eq!(
        reporter.events(),
        vec![HealthEvent::BootstrapStarting, HealthEvent::BootstrapSucceeded]
    );
}

#[rstest]
fn static_loader_returns_resolved_configuration() {
    let source = TestConfigLoader::new().with_max_jobs(5);
    let loader = StaticConfigLoader::new(source.config());
    let reporter = Arc::new(RecordingHealthReporter::default());

    let daemon = bootstrap_with(&loader, reporter).expect("bootstrap should succeed");

    assert_eq!(daemon.config(), &source.config());
}

#[rstest]
fn configuration_failure_is_reported() {
    let reporter = Arc::new(RecordingHealthReporter::default());

    let error = bootstrap_with(&FailingConfigLoader, reporter.clone())
        .err()
        .expect("bootstrap should fail");

    assert!(matches!(error, BootstrapError::Configuration { .. }));
    assert!(
        reporter
            .events()
            .iter()
            .any(|event| matches!(event, HealthEvent::BootstrapFailed(_)))
    );
}

#[rstest]
fn socket_without_parent_fails_preparation() {
    let mut config = TestConfigLoader::new().config();
    config.daemon_socket = kmo_batch_config::SocketEndpoint::unix("kmo-batchd.sock");
    let reporter = Arc::new(RecordingHealthReporter::default());

    let error = bootstrap_with(&StaticConfigLoader::new(config), reporter)
        .err()
        .expect("bootstrap should fail");

    assert!(matches!(error, BootstrapError::Socket { .. }));
}
