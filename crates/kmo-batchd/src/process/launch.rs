//! Sequences daemon start-up, the event loop and shutdown.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use kmo_batch_config::Config;

use crate::bootstrap::{ConfigLoader, StaticConfigLoader, bootstrap_with};
use crate::event_loop::{DEFAULT_POLL_INTERVAL, EventLoop};
use crate::health::{HealthReporter, StructuredHealthReporter};
use crate::transport::SocketListener;

use super::PROCESS_TARGET;
use super::daemonizer::{Daemonizer, SystemDaemonizer};
use super::errors::LaunchError;
use super::shutdown::{ShutdownSignal, SystemShutdownSignal};

/// Launch mode for the daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchMode {
    /// Fork into the background and detach from the controlling terminal.
    Background,
    /// Remain attached to the terminal.
    Foreground,
}

impl LaunchMode {
    /// Maps the `-d` flag onto a launch mode.
    #[must_use]
    pub const fn from_detach(detach: bool) -> Self {
        if detach {
            Self::Background
        } else {
            Self::Foreground
        }
    }
}

/// Process-level collaborators needed to control daemon lifecycle.
pub(crate) struct ProcessControl<D, S> {
    pub(crate) mode: LaunchMode,
    pub(crate) daemonizer: D,
    pub(crate) shutdown: S,
}

/// Service dependencies required to construct the daemon runtime.
pub(crate) struct ServiceDeps<L> {
    pub(crate) loader: L,
    pub(crate) reporter: Arc<dyn HealthReporter>,
}

/// Collaborators required to launch the daemon runtime.
pub(crate) struct LaunchPlan<L, D, S> {
    pub(crate) process: ProcessControl<D, S>,
    pub(crate) services: ServiceDeps<L>,
    pub(crate) poll_interval: Duration,
}

/// Runs the daemon with `config` until a termination signal arrives.
///
/// # Errors
///
/// Returns [`LaunchError`] when start-up fails or the event loop stops with an
/// error. A signal-driven stop returns `Ok(())`.
pub fn run_daemon(config: Config, mode: LaunchMode) -> Result<(), LaunchError> {
    let shutdown = SystemShutdownSignal::install()?;
    let plan = LaunchPlan {
        process: ProcessControl {
            mode,
            daemonizer: SystemDaemonizer::new(),
            shutdown: shutdown.clone(),
        },
        services: ServiceDeps {
            loader: StaticConfigLoader::new(config),
            reporter: Arc::new(StructuredHealthReporter::new()),
        },
        poll_interval: DEFAULT_POLL_INTERVAL,
    };
    run_daemon_with(plan)?;
    if let Some(signal) = shutdown.received() {
        info!(
            target: PROCESS_TARGET,
            signal,
            "shutdown signal received"
        );
    }
    Ok(())
}

/// Runs the daemon with injected collaborators.
pub(crate) fn run_daemon_with<L, D, S>(plan: LaunchPlan<L, D, S>) -> Result<(), LaunchError>
where
    L: ConfigLoader,
    D: Daemonizer,
    S: ShutdownSignal,
{
    let LaunchPlan {
        process,
        services,
        poll_interval,
    } = plan;
    let ProcessControl {
        mode,
        daemonizer,
        shutdown,
    } = process;
    let ServiceDeps { loader, reporter } = services;

    let daemon = bootstrap_with(&loader, reporter)?;
    info!(
        target: PROCESS_TARGET,
        ?mode,
        "starting daemon runtime"
    );
    if matches!(mode, LaunchMode::Background) {
        let working_dir = daemon
            .config()
            .daemon_socket()
            .path()
            .parent()
            .map_or_else(|| Path::new("/"), |parent| parent.as_std_path());
        daemonizer.daemonize(working_dir)?;
    }

    let listener = match SocketListener::bind(daemon.config().daemon_socket()) {
        Ok(listener) => listener,
        Err(error) => {
            daemon.reporter().listener_failed(&error);
            return Err(error.into());
        }
    };
    daemon.reporter().listener_ready(daemon.config());

    let outcome = EventLoop::new(listener, daemon.config(), shutdown)
        .and_then(|event_loop| event_loop.with_poll_interval(poll_interval).run());
    daemon.reporter().event_loop_stopped(outcome.as_ref().err());
    outcome?;

    info!(
        target: PROCESS_TARGET,
        "shutdown sequence completed"
    );
    Ok(())
}
