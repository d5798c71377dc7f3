//! Configuration loaders used by the bootstrap and launch suites.

use std::ffi::OsString;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::Arc;

use ortho_config::{OrthoConfig, OrthoError};
use tempfile::TempDir;

use kmo_batch_config::{Config, SocketEndpoint};

use crate::bootstrap::ConfigLoader;

/// Loader that provisions a Unix socket path under a temporary directory.
pub struct TestConfigLoader {
    socket_dir: TempDir,
    max_jobs: NonZeroUsize,
}

impl TestConfigLoader {
    #[must_use]
    pub fn new() -> Self {
        Self {
            socket_dir: TempDir::new().expect("failed to create temporary directory for socket"),
            max_jobs: NonZeroUsize::MIN,
        }
    }

    /// Sets the ceiling handed to the daemon.
    #[must_use]
    pub fn with_max_jobs(mut self, max_jobs: usize) -> Self {
        self.max_jobs = NonZeroUsize::new(max_jobs).expect("ceiling must be non-zero");
        self
    }

    /// Path of the socket the loaded configuration names.
    #[must_use]
    pub fn socket_path(&self) -> PathBuf {
        self.socket_dir.path().join("kmo-batchd.sock")
    }

    /// Builds the configuration without going through the trait.
    #[must_use]
    pub fn config(&self) -> Config {
        let path = self.socket_path();
        let path = path
            .to_str()
            .expect("temporary socket path was not valid UTF-8")
            .to_owned();
        Config {
            daemon_socket: SocketEndpoint::unix(path),
            max_jobs: self.max_jobs,
            ..Config::default()
        }
    }
}

impl Default for TestConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader for TestConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(self.config())
    }
}

/// Loader that fails by passing a zero ceiling on the command line.
pub struct FailingConfigLoader;

impl ConfigLoader for FailingConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        let args = vec![
            OsString::from("kmo-batchd"),
            OsString::from("--max-jobs"),
            OsString::from("0"),
        ];
        Config::load_from_iter(args)
    }
}
