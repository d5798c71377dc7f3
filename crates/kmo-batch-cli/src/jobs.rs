//! Client side of the `list` and `run` subcommands.

use std::ffi::OsString;
use std::io::{Read, Write};
use std::os::unix::net::UnixStream;
use std::os::unix::process::ExitStatusExt;
use std::process::{self, ExitCode, ExitStatus};

use kmo_batch_config::Config;
use kmo_batch_protocol::{Command, Job, read_command, write_command, write_submission};

use crate::AppError;
use crate::transport::connect;

/// Base added to a signal number when a child is killed by that signal.
const SIGNAL_EXIT_BASE: i32 = 128;

/// Requests the job listing and copies it to `stdout`.
pub(crate) fn list_jobs<W: Write>(config: &Config, stdout: &mut W) -> Result<ExitCode, AppError> {
    let mut stream = connect(config.daemon_socket())?;
    write_command(&mut stream, Command::ListJobs).map_err(AppError::SendRequest)?;

    let mut listing = Vec::new();
    stream
        .read_to_end(&mut listing)
        .map_err(AppError::ReadListing)?;
    stdout
        .write_all(&listing)
        .and_then(|()| stdout.flush())
        .map_err(AppError::ForwardListing)?;
    Ok(ExitCode::SUCCESS)
}

/// Submits a job, waits for admission, then runs `command` to completion.
///
/// The daemon connection stays open while the child runs; closing it is how
/// the daemon learns the slot is free again.
pub(crate) fn run_job(
    config: &Config,
    memory: u64,
    command: &[OsString],
) -> Result<ExitCode, AppError> {
    let (program, arguments) = command.split_first().ok_or(AppError::MissingCommand)?;
    let mut stream = connect(config.daemon_socket())?;
    write_submission(&mut stream, &Job::new(memory)).map_err(AppError::SendRequest)?;
    await_start(&mut stream)?;

    let status = process::Command::new(program)
        .args(arguments)
        .status()
        .map_err(|source| AppError::Spawn {
            program: program.to_string_lossy().into_owned(),
            source,
        })?;
    drop(stream);
    Ok(exit_code_for(status))
}

fn await_start(stream: &mut UnixStream) -> Result<(), AppError> {
    match read_command(stream) {
        Ok(Command::StartJob) => Ok(()),
        Ok(other) => Err(AppError::UnexpectedReply(other)),
        Err(error) if error.is_empty_stream() => Err(AppError::DaemonClosed),
        Err(error) => Err(AppError::ReadReply(error)),
    }
}

fn exit_code_for(status: ExitStatus) -> ExitCode {
    let raw = status
        .code()
        .or_else(|| status.signal().map(|signal| SIGNAL_EXIT_BASE + signal));
    match raw.and_then(|code| u8::try_from(code).ok()) {
        Some(code) => ExitCode::from(code),
        None => ExitCode::FAILURE,
    }
}
