//! Process-level lifecycle: detaching, signal-driven shutdown and the launch
//! sequence that ties bootstrap, listener and event loop together.

pub(crate) mod daemonizer;
mod errors;
pub(crate) mod launch;
pub(crate) mod shutdown;

pub use daemonizer::{DaemonizeError, Daemonizer, SystemDaemonizer};
pub use errors::LaunchError;
pub use launch::{LaunchMode, run_daemon};
pub use shutdown::{ShutdownError, ShutdownSignal, SystemShutdownSignal};

pub(crate) const PROCESS_TARGET: &str = "kmo_batchd::process";
