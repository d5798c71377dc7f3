//! Detaches `kmo-batch daemon -d` from its terminal.

use std::ffi::OsStr;
use std::path::Path;

use daemonize_me::Daemon;
use thiserror::Error;
use tracing::info;

use super::PROCESS_TARGET;

/// Abstraction over daemonisation strategies.
pub trait Daemonizer {
    /// Detaches the process into the background, continuing in the child.
    ///
    /// # Errors
    ///
    /// Returns [`DaemonizeError`] when the fork or session setup fails.
    fn daemonize(&self, working_dir: &Path) -> Result<(), DaemonizeError>;
}

/// Errors surfaced by the daemonisation backend.
#[derive(Debug, Error)]
pub enum DaemonizeError {
    /// System-level daemonisation failed.
    #[error("{0}")]
    System(#[from] daemonize_me::DaemonError),
}

/// Daemoniser that delegates to `daemonize-me`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemDaemonizer;

impl SystemDaemonizer {
    /// Builds a new system daemoniser.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Daemonizer for SystemDaemonizer {
    fn daemonize(&self, working_dir: &Path) -> Result<(), DaemonizeError> {
        info!(
            target: PROCESS_TARGET,
            working_dir = %working_dir.display(),
            "detaching into background"
        );
        Daemon::new()
            .work_dir(working_dir)
            .name(OsStr::new("kmo-batchd"))
            .start()?;
        info!(
            target: PROCESS_TARGET,
            pid = std::process::id(),
            "daemon process detached; continuing in child"
        );
        Ok(())
    }
}
