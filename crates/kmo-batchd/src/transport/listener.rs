//! Listener implementation for the daemon socket.

use std::fs;
use std::io;
use std::os::fd::{AsFd, BorrowedFd};
use std::os::unix::fs::FileTypeExt;
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::Path;

use tracing::{debug, warn};

use kmo_batch_config::SocketEndpoint;

use super::{LISTENER_TARGET, ListenerError};

/// Non-blocking listener bound to the daemon socket.
///
/// The socket file is removed when the listener is dropped.
#[derive(Debug)]
pub struct SocketListener {
    endpoint: SocketEndpoint,
    listener: UnixListener,
}

impl SocketListener {
    /// Binds `endpoint`, replacing a stale socket file if nothing answers on it.
    ///
    /// # Errors
    ///
    /// Returns [`ListenerError::UnixInUse`] when a live process accepts on the
    /// path, [`ListenerError::UnixNotSocket`] when a non-socket file occupies
    /// it, and the remaining variants when binding fails.
    pub fn bind(endpoint: &SocketEndpoint) -> Result<Self, ListenerError> {
        let path = endpoint.path().as_std_path();
        let listener = bind_unix(path)?;
        let bound = Self {
            endpoint: endpoint.clone(),
            listener,
        };
        bound
            .listener
            .set_nonblocking(true)
            .map_err(|source| ListenerError::NonBlocking { source })?;
        debug!(
            target: LISTENER_TARGET,
            endpoint = %bound.endpoint,
            "socket listener bound"
        );
        Ok(bound)
    }

    /// Endpoint the listener is bound to.
    #[must_use]
    pub const fn endpoint(&self) -> &SocketEndpoint {
        &self.endpoint
    }

    /// Accepts one pending connection.
    ///
    /// Returns `Ok(None)` once the backlog is drained.
    pub(crate) fn accept(&self) -> io::Result<Option<UnixStream>> {
        loop {
            match self.listener.accept() {
                Ok((stream, _)) => return Ok(Some(stream)),
                Err(error) if error.kind() == io::ErrorKind::WouldBlock => return Ok(None),
                Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
                Err(error) => return Err(error),
            }
        }
    }
}

impl AsFd for SocketListener {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.listener.as_fd()
    }
}

impl Drop for SocketListener {
    fn drop(&mut self) {
        cleanup_unix_socket(&self.endpoint);
    }
}

fn bind_unix(path: &Path) -> Result<UnixListener, ListenerError> {
    if path.exists() {
        let metadata =
            fs::symlink_metadata(path).map_err(|source| ListenerError::UnixMetadata {
                path: path.display().to_string(),
                source,
            })?;
        if !metadata.file_type().is_socket() {
            return Err(ListenerError::UnixNotSocket {
                path: path.display().to_string(),
            });
        }
        match UnixStream::connect(path) {
            Ok(_stream) => {
                return Err(ListenerError::UnixInUse {
                    path: path.display().to_string(),
                });
            }
            Err(error)
                if error.kind() == io::ErrorKind::ConnectionRefused
                    || error.kind() == io::ErrorKind::NotFound =>
            {
                warn!(
                    target: LISTENER_TARGET,
                    path = %path.display(),
                    "removing stale unix socket"
                );
                fs::remove_file(path).map_err(|source| ListenerError::UnixCleanup {
                    path: path.display().to_string(),
                    source,
                })?;
            }
            Err(error) => {
                return Err(ListenerError::UnixConnect {
                    path: path.display().to_string(),
                    source: error,
                });
            }
        }
    }

    UnixListener::bind(path).map_err(|source| ListenerError::BindUnix {
        path: path.display().to_string(),
        source,
    })
}

fn cleanup_unix_socket(endpoint: &SocketEndpoint) {
    let path = endpoint.path();
    if let Err(error) = fs::remove_file(path.as_std_path())
        && error.kind() != io::ErrorKind::NotFound
    {
        warn!(
            target: LISTENER_TARGET,
            error = %error,
            path = %path,
            "failed to remove unix socket file"
        );
    }
}
