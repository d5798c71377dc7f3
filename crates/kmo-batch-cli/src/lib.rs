//! Command-line interface runtime for the `kmo-batch` scheduler.
//!
//! The module owns argument parsing, configuration bootstrapping and the
//! client side of the daemon protocol. The `daemon` subcommand runs the
//! scheduler in-process; `list` and `run` connect to it over the configured
//! Unix socket. Configuration loading, the daemon launcher and the IO streams
//! can all be substituted so the runtime is testable without a real daemon.

use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;

use clap::Parser;

mod cli;
mod config;
mod daemon;
mod errors;
mod jobs;
mod transport;

use cli::{Cli, CliCommand};
use config::{ConfigArgumentSplit, split_config_arguments};
pub(crate) use config::{ConfigLoader, OrthoConfigLoader};
use daemon::{DaemonLauncher, SystemDaemonLauncher};
pub(crate) use errors::AppError;
use errors::is_daemon_not_running;

/// CLI flags recognised by the configuration loader.
///
/// MAINTENANCE: keep in sync with the fields of `kmo_batch_config::Config`.
const CONFIG_CLI_FLAGS: &[&str] = &[
    "--config-path",
    "--daemon-socket",
    "--max-jobs",
    "--log-filter",
    "--log-format",
    "--command-timeout-ms",
];

/// Bundles the IO streams provided to the CLI runtime.
pub(crate) struct IoStreams<'a, W: Write, E: Write> {
    pub(crate) stdout: &'a mut W,
    pub(crate) stderr: &'a mut E,
}

impl<'a, W: Write, E: Write> IoStreams<'a, W, E> {
    pub(crate) const fn new(stdout: &'a mut W, stderr: &'a mut E) -> Self {
        Self { stdout, stderr }
    }
}

struct CliRunner<'a, W: Write, E: Write, L: ConfigLoader, D: DaemonLauncher> {
    io: &'a mut IoStreams<'a, W, E>,
    loader: &'a L,
    launcher: &'a D,
}

impl<'a, W, E, L, D> CliRunner<'a, W, E, L, D>
where
    W: Write,
    E: Write,
    L: ConfigLoader,
    D: DaemonLauncher,
{
    const fn new(io: &'a mut IoStreams<'a, W, E>, loader: &'a L, launcher: &'a D) -> Self {
        Self {
            io,
            loader,
            launcher,
        }
    }

    fn run<I>(&mut self, args: I) -> ExitCode
    where
        I: IntoIterator<Item = OsString>,
    {
        let args: Vec<OsString> = args.into_iter().collect();
        let split = split_config_arguments(&args);
        let cli_arguments = prepare_cli_arguments(&args, &split);

        let cli = match Cli::try_parse_from(cli_arguments) {
            Ok(cli) => cli,
            Err(error) if !error.use_stderr() => {
                let _ = write!(self.io.stdout, "{}", error.render());
                return ExitCode::SUCCESS;
            }
            Err(error) => return self.report(&AppError::CliUsage(error)),
        };

        let result = self
            .loader
            .load(&split.config_arguments)
            .and_then(|config| self.dispatch(cli.command, config));

        match result {
            Ok(exit_code) => exit_code,
            Err(error) => self.report(&error),
        }
    }

    fn dispatch(
        &mut self,
        command: CliCommand,
        config: kmo_batch_config::Config,
    ) -> Result<ExitCode, AppError> {
        match command {
            CliCommand::Daemon { detach, max_jobs } => {
                daemon::start(self.launcher, config, detach, max_jobs)?;
                Ok(ExitCode::SUCCESS)
            }
            CliCommand::List => jobs::list_jobs(&config, &mut *self.io.stdout),
            CliCommand::Run { memory, command } => jobs::run_job(&config, memory, &command),
        }
    }

    fn report(&mut self, error: &AppError) -> ExitCode {
        let _ = writeln!(self.io.stderr, "{error}");
        if is_daemon_not_running(error) {
            let _ = writeln!(
                self.io.stderr,
                "hint: start the scheduler with `kmo-batch daemon`"
            );
        }
        ExitCode::FAILURE
    }
}

/// Runs the CLI using the provided arguments and IO handles.
#[must_use]
pub fn run<I, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    let mut io = IoStreams::new(stdout, stderr);
    run_with(args, &mut io, &OrthoConfigLoader, &SystemDaemonLauncher)
}

pub(crate) fn run_with<'a, I, W, E, L, D>(
    args: I,
    io: &'a mut IoStreams<'a, W, E>,
    loader: &'a L,
    launcher: &'a D,
) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
    L: ConfigLoader,
    D: DaemonLauncher,
{
    CliRunner::new(io, loader, launcher).run(args)
}

fn prepare_cli_arguments(args: &[OsString], split: &ConfigArgumentSplit) -> Vec<OsString> {
    let mut cli_arguments: Vec<OsString> = Vec::new();
    if let Some(first) = args.first() {
        cli_arguments.push(first.clone());
    }
    if let Some(rest) = args.get(split.command_start..) {
        cli_arguments.extend(rest.iter().cloned());
    }
    cli_arguments
}
