//! The `kmo-batch` admission daemon.
//!
//! The daemon listens on a Unix socket for batch job submissions and decides
//! when each job may start. A submitter connects, sends `NEW_JOB` followed by
//! an eight-byte job record, and then waits. When fewer than `max_jobs` jobs
//! are running, the oldest waiting submitter receives a one-byte `START_JOB`
//! and runs its workload while keeping the connection open; hanging up frees
//! the slot. `LIST_JOBS` returns a text listing of both queues.
//!
//! Everything runs on one thread: an epoll loop accepts connections, reads
//! their opening command, watches held connections for hang-up and runs an
//! admission pass after each batch of events. The [`scheduler`] module holds
//! the queue state and admission policy independently of any socket so it can
//! be exercised directly.

mod bootstrap;
mod event_loop;
mod health;
mod process;
pub mod scheduler;
mod telemetry;
mod transport;

pub use bootstrap::{BootstrapError, ConfigLoader, Daemon, StaticConfigLoader, bootstrap_with};
pub use event_loop::{DEFAULT_POLL_INTERVAL, EpollWatchSet, EventLoop, EventLoopError, Intake};
pub use health::{HealthReporter, StructuredHealthReporter};
pub use process::{
    DaemonizeError, Daemonizer, LaunchError, LaunchMode, ShutdownError, ShutdownSignal,
    SystemDaemonizer, SystemShutdownSignal, run_daemon,
};
pub use telemetry::{TelemetryError, TelemetryHandle};
pub use transport::{ListenerError, SocketListener};

#[cfg(test)]
mod tests;
