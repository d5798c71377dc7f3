//! Errors that stop the event loop.

use std::io;

use thiserror::Error;

/// Failures of the readiness multiplexer itself.
///
/// Per-connection failures never surface here; they are logged and the
/// offending connection is closed.
#[derive(Debug, Error)]
pub enum EventLoopError {
    /// The epoll instance could not be created.
    #[error("failed to create readiness instance: {source}")]
    Create {
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },
    /// The listening socket could not be registered.
    #[error("failed to watch listening socket: {source}")]
    WatchListener {
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },
    /// Waiting for readiness failed with something other than an interruption.
    #[error("failed waiting for socket readiness: {source}")]
    Wait {
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },
}
