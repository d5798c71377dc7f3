//! Shared configuration for the `kmo-batch` client and daemon.
//!
//! Configuration is layered by [`ortho_config`]: built-in defaults, then an
//! optional TOML file (`--config-path` or `KMO_BATCH_CONFIG_PATH`), then
//! `KMO_BATCH_*` environment variables, then command-line flags. Both binaries
//! resolve the same [`Config`] so the client always dials the socket the daemon
//! bound.

mod defaults;
mod logging;
mod socket;

use std::num::NonZeroUsize;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

pub use defaults::{
    DEFAULT_COMMAND_TIMEOUT_MS, DEFAULT_LOG_FILTER, DEFAULT_MAX_JOBS, SOCKET_FILE_NAME,
    default_log_filter_string, default_log_format, default_socket_endpoint,
};
pub use logging::{LogFormat, LogFormatParseError};
pub use socket::{SocketEndpoint, SocketParseError, SocketPreparationError};

/// Resolved configuration for the batch scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "KMO_BATCH")]
pub struct Config {
    /// Socket the daemon binds and clients connect to.
    #[ortho_config(default = defaults::default_socket_endpoint())]
    pub daemon_socket: SocketEndpoint,
    /// Maximum number of jobs admitted at once.
    #[ortho_config(default = defaults::DEFAULT_MAX_JOBS)]
    pub max_jobs: NonZeroUsize,
    /// `tracing` filter expression for daemon logs.
    #[ortho_config(default = defaults::default_log_filter_string())]
    pub log_filter: String,
    /// Output format for daemon logs.
    #[ortho_config(default = defaults::default_log_format())]
    pub log_format: LogFormat,
    /// Bound on the synchronous command read per connection; zero waits forever.
    #[ortho_config(default = defaults::DEFAULT_COMMAND_TIMEOUT_MS)]
    pub command_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            daemon_socket: default_socket_endpoint(),
            max_jobs: DEFAULT_MAX_JOBS,
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
            command_timeout_ms: DEFAULT_COMMAND_TIMEOUT_MS,
        }
    }
}

impl Config {
    /// Socket endpoint shared by the daemon and its clients.
    #[must_use]
    pub fn daemon_socket(&self) -> &SocketEndpoint {
        &self.daemon_socket
    }

    /// Concurrency ceiling for admitted jobs.
    #[must_use]
    pub const fn max_jobs(&self) -> NonZeroUsize {
        self.max_jobs
    }

    /// Filter expression handed to the tracing subscriber.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Selected log output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Read timeout for the command of a freshly accepted connection.
    ///
    /// Returns `None` when the timeout is disabled, in which case a silent
    /// client holds the event loop until it sends or disconnects.
    #[must_use]
    pub const fn command_timeout(&self) -> Option<Duration> {
        match self.command_timeout_ms {
            0 => None,
            millis => Some(Duration::from_millis(millis)),
        }
    }

    /// Returns a copy with the concurrency ceiling replaced.
    #[must_use]
    pub fn with_max_jobs(mut self, max_jobs: NonZeroUsize) -> Self {
        self.max_jobs = max_jobs;
        self
    }
}
