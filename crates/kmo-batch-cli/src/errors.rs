//! Error types for the CLI runtime.

use std::io;
use std::sync::Arc;

use kmo_batch_protocol::{Command, ProtocolError};
use thiserror::Error;

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("failed to load configuration: {0}")]
    LoadConfiguration(Arc<ortho_config::OrthoError>),
    #[error("{0}")]
    CliUsage(clap::Error),
    #[error("failed to connect to daemon at {endpoint}: {source}")]
    Connect { endpoint: String, source: io::Error },
    #[error("failed to send request to daemon: {0}")]
    SendRequest(ProtocolError),
    #[error("failed to read reply from daemon: {0}")]
    ReadReply(ProtocolError),
    #[error("failed to read job listing from daemon: {0}")]
    ReadListing(io::Error),
    #[error("failed to write job listing: {0}")]
    ForwardListing(io::Error),
    #[error("daemon closed the connection before starting the job")]
    DaemonClosed,
    #[error("unexpected reply from daemon: {0}")]
    UnexpectedReply(Command),
    #[error("no command given to run")]
    MissingCommand,
    #[error("failed to run '{program}': {source}")]
    Spawn { program: String, source: io::Error },
    #[error("daemon failed: {0}")]
    Daemon(#[from] kmo_batchd::LaunchError),
}

/// Determines whether an error indicates the daemon is not running.
///
/// Returns true for connection-refused and socket-not-found errors.
pub(crate) fn is_daemon_not_running(error: &AppError) -> bool {
    match error {
        AppError::Connect { source, .. } => matches!(
            source.kind(),
            io::ErrorKind::ConnectionRefused | io::ErrorKind::NotFound
        ),
        _ => false,
    }
}
