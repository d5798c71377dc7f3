//! Runs the scheduler daemon in-process for the `daemon` subcommand.

use std::num::NonZeroUsize;

use kmo_batch_config::Config;
use kmo_batchd::{LaunchMode, run_daemon};

use crate::AppError;

/// Starts the daemon with the resolved configuration.
pub(crate) trait DaemonLauncher {
    fn launch(&self, config: Config, mode: LaunchMode) -> Result<(), AppError>;
}

/// Launches the real daemon via [`run_daemon`].
pub(crate) struct SystemDaemonLauncher;

impl DaemonLauncher for SystemDaemonLauncher {
    fn launch(&self, config: Config, mode: LaunchMode) -> Result<(), AppError> {
        run_daemon(config, mode).map_err(AppError::from)
    }
}

/// Applies `daemon` subcommand flags on top of the loaded configuration.
pub(crate) fn start<L: DaemonLauncher + ?Sized>(
    launcher: &L,
    config: Config,
    detach: bool,
    max_jobs: Option<NonZeroUsize>,
) -> Result<(), AppError> {
    let resolved = match max_jobs {
        Some(ceiling) => config.with_max_jobs(ceiling),
        None => config,
    };
    launcher.launch(resolved, LaunchMode::from_detach(detach))
}
