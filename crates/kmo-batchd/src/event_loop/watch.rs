//! Epoll-backed watch set for held client connections.

use std::io;
use std::os::fd::{AsRawFd, BorrowedFd};
use std::rc::Rc;

use nix::sys::epoll::{Epoll, EpollEvent, EpollFlags};
use tracing::warn;

use crate::scheduler::WatchSet;

use super::EVENT_LOOP_TARGET;

/// Registers held connections for edge-triggered hang-up notification.
#[derive(Debug, Clone)]
pub struct EpollWatchSet {
    epoll: Rc<Epoll>,
}

impl EpollWatchSet {
    pub(crate) const fn new(epoll: Rc<Epoll>) -> Self {
        Self { epoll }
    }
}

/// Interest registered for every held connection.
pub(crate) fn client_interest() -> EpollFlags {
    EpollFlags::EPOLLRDHUP | EpollFlags::EPOLLET
}

impl WatchSet for EpollWatchSet {
    fn watch(&mut self, descriptor: BorrowedFd<'_>) -> io::Result<()> {
        let token = u64::try_from(descriptor.as_raw_fd())
            .map_err(|_| io::Error::from(io::ErrorKind::InvalidInput))?;
        self.epoll
            .add(descriptor, EpollEvent::new(client_interest(), token))
            .map_err(io::Error::from)
    }

    fn unwatch(&mut self, descriptor: BorrowedFd<'_>) {
        if let Err(errno) = self.epoll.delete(descriptor) {
            warn!(
                target: EVENT_LOOP_TARGET,
                descriptor = descriptor.as_raw_fd(),
                error = %errno,
                "failed to unwatch connection"
            );
        }
    }
}
