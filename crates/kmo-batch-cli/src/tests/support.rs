//! Test doubles for the CLI runtime.

use std::cell::RefCell;
use std::ffi::OsString;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use kmo_batch_config::{Config, SocketEndpoint};
use kmo_batchd::{EventLoop, EventLoopError, LaunchMode, SocketListener};
use tempfile::TempDir;

use crate::daemon::DaemonLauncher;
use crate::{AppError, ConfigLoader, IoStreams, run_with};

const LOOP_INTERVAL: Duration = Duration::from_millis(20);
const STARTUP_TIMEOUT: Duration = Duration::from_secs(5);

/// Returns a fixed configuration regardless of arguments.
pub(super) struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    pub(super) const fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self, _args: &[OsString]) -> Result<Config, AppError> {
        Ok(self.config.clone())
    }
}

/// A config loader that panics if called, proving parsing failed first.
pub(super) struct PanickingLoader;

impl ConfigLoader for PanickingLoader {
    fn load(&self, _args: &[OsString]) -> Result<Config, AppError> {
        panic!("usage errors must not attempt configuration loading");
    }
}

/// Records daemon launches instead of starting a daemon.
#[derive(Default)]
pub(super) struct RecordingLauncher {
    pub(super) launches: RefCell<Vec<(NonZeroUsize, LaunchMode)>>,
}

impl DaemonLauncher for RecordingLauncher {
    fn launch(&self, config: Config, mode: LaunchMode) -> Result<(), AppError> {
        self.launches.borrow_mut().push((config.max_jobs(), mode));
        Ok(())
    }
}

/// Captured result of one CLI invocation.
pub(super) struct Invocation {
    pub(super) exit: ExitCode,
    pub(super) stdout: String,
    pub(super) stderr: String,
}

/// Runs the CLI with the given loader and launcher, capturing its output.
pub(super) fn invoke<L, D>(args: &[&str], loader: &L, launcher: &D) -> Invocation
where
    L: ConfigLoader,
    D: DaemonLauncher,
{
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let arguments = std::iter::once("kmo-batch")
        .chain(args.iter().copied())
        .map(OsString::from);
    let exit = {
        let mut io = IoStreams::new(&mut stdout, &mut stderr);
        run_with(arguments, &mut io, loader, launcher)
    };
    Invocation {
        exit,
        stdout: String::from_utf8(stdout).expect("stdout utf8"),
        stderr: String::from_utf8(stderr).expect("stderr utf8"),
    }
}

/// Builds a configuration pointing at `socket`.
pub(super) fn config_for(socket: PathBuf) -> Config {
    let path = socket.to_str().expect("utf8 socket path").to_owned();
    Config {
        daemon_socket: SocketEndpoint::unix(path),
        ..Config::default()
    }
}

/// Real scheduler event loop serving a temporary socket until dropped.
pub(super) struct LiveDaemon {
    _dir: TempDir,
    config: Config,
    shutdown: Arc<AtomicBool>,
    handle: Option<JoinHandle<Result<(), EventLoopError>>>,
}

impl LiveDaemon {
    pub(super) fn start(max_jobs: usize) -> Self {
        let dir = TempDir::new().expect("temp dir");
        let ceiling = NonZeroUsize::new(max_jobs).expect("non-zero ceiling");
        let config = config_for(dir.path().join("kmo-batchd.sock")).with_max_jobs(ceiling);
        let shutdown = Arc::new(AtomicBool::new(false));
        let loop_config = config.clone();
        let loop_shutdown = Arc::clone(&shutdown);
        let (ready_tx, ready_rx) = mpsc::channel();
        let handle = thread::spawn(move || {
            let listener =
                SocketListener::bind(loop_config.daemon_socket()).expect("bind socket");
            let event_loop = EventLoop::new(listener, &loop_config, loop_shutdown)
                .expect("create event loop")
                .with_poll_interval(LOOP_INTERVAL);
            ready_tx.send(()).expect("report readiness");
            event_loop.run()
        });
        ready_rx
            .recv_timeout(STARTUP_TIMEOUT)
            .expect("event loop should start");
        Self {
            _dir: dir,
            config,
            shutdown,
            handle: Some(handle),
        }
    }

    pub(super) fn config(&self) -> Config {
        self.config.clone()
    }
}

impl Drop for LiveDaemon {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
