//! Test harness utilities shared by the daemon suites.

mod config_loader;
mod daemon;
mod reporter;
mod world;

pub use config_loader::{FailingConfigLoader, TestConfigLoader};
pub use daemon::{RunningDaemon, await_start};
pub use reporter::{HealthEvent, RecordingHealthReporter};
pub use world::{TestWorld, world};
