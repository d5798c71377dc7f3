//! Socket transport helpers for the CLI.

use std::io;
use std::os::unix::net::UnixStream;
use std::time::Duration;

use kmo_batch_config::SocketEndpoint;
use socket2::{Domain, SockAddr, Socket, Type};

use super::AppError;

pub(super) const CONNECTION_TIMEOUT: Duration = Duration::from_secs(5);

/// Opens a stream to the daemon socket.
pub(super) fn connect(endpoint: &SocketEndpoint) -> Result<UnixStream, AppError> {
    connect_unix(endpoint).map_err(|source| AppError::Connect {
        endpoint: endpoint.to_string(),
        source,
    })
}

fn connect_unix(endpoint: &SocketEndpoint) -> io::Result<UnixStream> {
    let socket = Socket::new(Domain::UNIX, Type::STREAM, None)?;
    let address = SockAddr::unix(endpoint.path().as_std_path())?;
    socket.connect_timeout(&address, CONNECTION_TIMEOUT)?;
    Ok(UnixStream::from(std::os::fd::OwnedFd::from(socket)))
}
