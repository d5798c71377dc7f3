//! Readiness registration seam between the registry and the event loop.

use std::io;
use std::os::fd::BorrowedFd;

/// Set of descriptors monitored for peer hang-up.
///
/// The registry adds a connection when it takes ownership of it and removes it
/// before the connection is closed, so the set always mirrors the union of the
/// pending queue and the running set.
pub trait WatchSet {
    /// Starts monitoring `descriptor` for hang-up.
    ///
    /// # Errors
    ///
    /// Returns the underlying error when the descriptor cannot be registered;
    /// the caller must then refuse the connection.
    fn watch(&mut self, descriptor: BorrowedFd<'_>) -> io::Result<()>;

    /// Stops monitoring `descriptor`. Failures are logged by implementations.
    fn unwatch(&mut self, descriptor: BorrowedFd<'_>);
}
