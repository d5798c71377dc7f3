//! CLI argument definitions for `kmo-batch`.

use std::ffi::OsString;
use std::num::NonZeroUsize;

use clap::{Parser, Subcommand};

/// Simple batch scheduler: runs commands once a concurrency slot is free.
#[derive(Parser, Debug)]
#[command(
    name = "kmo-batch",
    version,
    disable_help_subcommand = true,
    after_help = "Configuration flags (--config-path, --daemon-socket, --max-jobs, --log-filter, \
                  --log-format, --command-timeout-ms) must appear before the subcommand."
)]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub(crate) command: CliCommand,
}

/// Subcommands understood by `kmo-batch`.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub(crate) enum CliCommand {
    /// Starts the scheduler daemon.
    Daemon {
        /// Detach from the terminal and run in the background.
        #[arg(short = 'd', long = "detach")]
        detach: bool,
        /// Maximum number of jobs allowed to run at once.
        #[arg(short = 'm', long = "max-jobs", value_name = "N")]
        max_jobs: Option<NonZeroUsize>,
    },
    /// Lists waiting and running jobs.
    List,
    /// Waits for a free slot, then runs a command.
    Run {
        /// Memory the job expects to use, in bytes.
        #[arg(short = 'M', long = "memory", value_name = "BYTES", default_value_t = 0)]
        memory: u64,
        /// Command and arguments to run once admitted.
        #[arg(
            value_name = "COMMAND",
            required = true,
            num_args = 1..,
            trailing_var_arg = true,
            allow_hyphen_values = true
        )]
        command: Vec<OsString>,
    },
}
