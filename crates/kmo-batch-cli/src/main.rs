//! CLI entrypoint for the `kmo-batch` scheduler.
//!
//! The binary delegates to [`kmo_batch_cli::run`], which loads configuration,
//! parses the subcommand and either runs the daemon or talks to it.

use std::io::{self, StderrLock, StdoutLock};
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stdout: StdoutLock<'_> = io::stdout().lock();
    let mut stderr: StderrLock<'_> = io::stderr().lock();
    kmo_batch_cli::run(std::env::args_os(), &mut stdout, &mut stderr)
}
