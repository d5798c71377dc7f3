//! First-contact handling for freshly accepted connections.
//!
//! The command tag and, for submissions, the job record are read with blocking
//! calls. A submitter that connects and then stays silent therefore holds the
//! loop until it writes or hangs up, unless a command timeout is configured.

use std::io::{self, Write};
use std::os::fd::{AsRawFd, RawFd};
use std::os::unix::net::UnixStream;
use std::time::Duration;

use kmo_batch_protocol::{Command, ProtocolError, read_command, read_job};
use tracing::{debug, info, warn};

use crate::scheduler::{Scheduler, WatchSet};

use super::EVENT_LOOP_TARGET;

/// What happened to an accepted connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intake {
    /// A listing was written and the connection closed.
    Listed,
    /// A job was queued; the scheduler now owns the connection.
    Queued,
    /// The connection was closed without touching scheduler state.
    Rejected,
}

/// Reads the opening command from `stream` and acts on it.
pub(crate) fn handle_connection<W: WatchSet>(
    mut stream: UnixStream,
    scheduler: &mut Scheduler<UnixStream, W>,
    command_timeout: Option<Duration>,
) -> Intake {
    let descriptor = stream.as_raw_fd();
    if let Err(error) = prepare_stream(&stream, command_timeout) {
        warn!(
            target: EVENT_LOOP_TARGET,
            descriptor,
            error = %error,
            "failed to configure accepted connection"
        );
        return Intake::Rejected;
    }

    match read_command(&mut stream) {
        Ok(Command::ListJobs) => reply_with_listing(stream, scheduler),
        Ok(Command::NewJob) => queue_submission(stream, scheduler),
        Ok(Command::StartJob) => {
            warn!(
                target: EVENT_LOOP_TARGET,
                descriptor,
                command = %Command::StartJob,
                "client sent a daemon-only command"
            );
            Intake::Rejected
        }
        Err(error) => {
            log_malformed(descriptor, &error);
            Intake::Rejected
        }
    }
}

fn prepare_stream(stream: &UnixStream, command_timeout: Option<Duration>) -> io::Result<()> {
    stream.set_nonblocking(false)?;
    stream.set_read_timeout(command_timeout)?;
    stream.set_write_timeout(command_timeout)
}

fn reply_with_listing<W: WatchSet>(
    mut stream: UnixStream,
    scheduler: &Scheduler<UnixStream, W>,
) -> Intake {
    let listing = scheduler.snapshot().to_string();
    match stream.write_all(listing.as_bytes()) {
        Ok(()) => {
            debug!(
                target: EVENT_LOOP_TARGET,
                descriptor = stream.as_raw_fd(),
                bytes = listing.len(),
                "listing sent"
            );
            Intake::Listed
        }
        Err(error) => {
            warn!(
                target: EVENT_LOOP_TARGET,
                descriptor = stream.as_raw_fd(),
                error = %error,
                "failed to send listing"
            );
            Intake::Rejected
        }
    }
}

fn queue_submission<W: WatchSet>(
    mut stream: UnixStream,
    scheduler: &mut Scheduler<UnixStream, W>,
) -> Intake {
    let descriptor = stream.as_raw_fd();
    let job = match read_job(&mut stream) {
        Ok(job) => job,
        Err(error) => {
            log_malformed(descriptor, &error);
            return Intake::Rejected;
        }
    };
    match scheduler.submit(stream, job) {
        Ok(handle) => {
            info!(
                target: EVENT_LOOP_TARGET,
                descriptor,
                sequence = handle.sequence(),
                memory = job.memory(),
                "job submitted"
            );
            Intake::Queued
        }
        Err(error) => {
            warn!(
                target: EVENT_LOOP_TARGET,
                descriptor,
                error = %error,
                "failed to queue job"
            );
            Intake::Rejected
        }
    }
}

fn log_malformed(descriptor: RawFd, error: &ProtocolError) {
    if error.is_empty_stream() {
        debug!(
            target: EVENT_LOOP_TARGET,
            descriptor,
            "connection closed before sending a command"
        );
    } else {
        warn!(
            target: EVENT_LOOP_TARGET,
            descriptor,
            error = %error,
            "malformed request"
        );
    }
}
