//! Single-threaded readiness loop driving the scheduler.
//!
//! One epoll instance watches the listening socket for new connections and
//! every held client connection for hang-up. Each wake-up handles the ready
//! descriptors and then runs one admission pass, so capacity freed by a
//! disconnect is reused before the loop sleeps again. The wait is bounded so a
//! shutdown request is noticed even when the socket is idle.

mod errors;
mod intake;
mod watch;

use std::os::fd::{AsFd, RawFd};
use std::os::unix::net::UnixStream;
use std::rc::Rc;
use std::time::Duration;

use nix::errno::Errno;
use nix::sys::epoll::{Epoll, EpollCreateFlags, EpollEvent, EpollFlags, EpollTimeout};
use tracing::{debug, info, warn};

use kmo_batch_config::Config;

use crate::process::ShutdownSignal;
use crate::scheduler::Scheduler;
use crate::transport::SocketListener;

pub use errors::EventLoopError;
pub use intake::Intake;
pub use watch::EpollWatchSet;

pub(crate) const EVENT_LOOP_TARGET: &str = "kmo_batchd::event_loop";

/// Upper bound on a single readiness wait.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

const LISTENER_TOKEN: u64 = u64::MAX;
const EVENT_CAPACITY: usize = 32;

/// Owns the listener, the readiness instance and the scheduler.
pub struct EventLoop<S> {
    epoll: Rc<Epoll>,
    listener: SocketListener,
    scheduler: Scheduler<UnixStream, EpollWatchSet>,
    shutdown: S,
    poll_interval: Duration,
    command_timeout: Option<Duration>,
}

impl<S: ShutdownSignal> EventLoop<S> {
    /// Registers `listener` with a fresh readiness instance.
    ///
    /// # Errors
    ///
    /// Returns [`EventLoopError`] when the epoll instance cannot be created or
    /// the listener cannot be registered.
    pub fn new(
        listener: SocketListener,
        config: &Config,
        shutdown: S,
    ) -> Result<Self, EventLoopError> {
        let epoll = Epoll::new(EpollCreateFlags::EPOLL_CLOEXEC).map_err(|errno| {
            EventLoopError::Create {
                source: errno.into(),
            }
        })?;
        epoll
            .add(
                listener.as_fd(),
                EpollEvent::new(EpollFlags::EPOLLIN | EpollFlags::EPOLLET, LISTENER_TOKEN),
            )
            .map_err(|errno| EventLoopError::WatchListener {
                source: errno.into(),
            })?;
        let epoll = Rc::new(epoll);
        let scheduler = Scheduler::new(
            config.max_jobs(),
            EpollWatchSet::new(Rc::clone(&epoll)),
        );
        Ok(Self {
            epoll,
            listener,
            scheduler,
            shutdown,
            poll_interval: DEFAULT_POLL_INTERVAL,
            command_timeout: config.command_timeout(),
        })
    }

    /// Overrides the readiness wait bound.
    #[must_use]
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Runs until shutdown is requested.
    ///
    /// On return every held connection is closed and the socket file removed.
    ///
    /// # Errors
    ///
    /// Returns [`EventLoopError::Wait`] when waiting for readiness fails with
    /// anything other than an interruption.
    pub fn run(mut self) -> Result<(), EventLoopError> {
        info!(
            target: EVENT_LOOP_TARGET,
            endpoint = %self.listener.endpoint(),
            max_jobs = self.scheduler.max_jobs().get(),
            "accepting connections"
        );
        let mut events = [EpollEvent::empty(); EVENT_CAPACITY];
        while !self.shutdown.requested() {
            self.turn(&mut events)?;
        }
        info!(
            target: EVENT_LOOP_TARGET,
            pending = self.scheduler.registry().pending_len(),
            running = self.scheduler.registry().running_len(),
            "event loop stopping; closing held connections"
        );
        Ok(())
    }

    fn turn(&mut self, events: &mut [EpollEvent]) -> Result<(), EventLoopError> {
        let ready = match self.epoll.wait(events, wait_timeout(self.poll_interval)) {
            Ok(ready) => ready,
            Err(Errno::EINTR) => return Ok(()),
            Err(errno) => {
                return Err(EventLoopError::Wait {
                    source: errno.into(),
                });
            }
        };

        for event in events.iter().take(ready) {
            if event.data() == LISTENER_TOKEN {
                self.accept_ready();
            } else if event.events().intersects(hang_up()) {
                self.drop_descriptor(event.data());
            }
        }

        let report = self.scheduler.admit_pending();
        if !report.is_empty() {
            debug!(
                target: EVENT_LOOP_TARGET,
                admitted = report.admitted.len(),
                failed = report.failed.len(),
                "admission pass completed"
            );
        }
        Ok(())
    }

    fn accept_ready(&mut self) {
        loop {
            match self.listener.accept() {
                Ok(Some(stream)) => {
                    intake::handle_connection(stream, &mut self.scheduler, self.command_timeout);
                }
                Ok(None) => break,
                Err(error) => {
                    warn!(
                        target: EVENT_LOOP_TARGET,
                        error = %error,
                        "socket accept error"
                    );
                    break;
                }
            }
        }
    }

    fn drop_descriptor(&mut self, token: u64) {
        match RawFd::try_from(token) {
            Ok(descriptor) => {
                self.scheduler.disconnect(descriptor);
            }
            Err(_) => warn!(
                target: EVENT_LOOP_TARGET,
                token,
                "readiness event carried an invalid descriptor"
            ),
        }
    }
}

/// Converts the poll interval to an epoll timeout, saturating at the largest wait.
fn wait_timeout(poll_interval: Duration) -> EpollTimeout {
    EpollTimeout::try_from(poll_interval).unwrap_or(EpollTimeout::MAX)
}

fn hang_up() -> EpollFlags {
    EpollFlags::EPOLLRDHUP | EpollFlags::EPOLLHUP | EpollFlags::EPOLLERR
}
