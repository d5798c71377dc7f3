use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGQUIT, SIGTERM};
use signal_hook::flag;
use thiserror::Error;

/// Polled by the event loop between readiness waits.
pub trait ShutdownSignal {
    /// Returns true once the daemon should stop.
    fn requested(&self) -> bool;
}

impl ShutdownSignal for Arc<AtomicBool> {
    fn requested(&self) -> bool {
        self.load(Ordering::SeqCst)
    }
}

/// Errors reported while installing signal handlers.
#[derive(Debug, Error)]
pub enum ShutdownError {
    /// Installing signal handlers failed.
    #[error("failed to install signal handlers: {source}")]
    Install {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Records the first termination signal delivered to the process.
///
/// Delivery also interrupts a pending readiness wait, so the loop observes
/// the request without waiting out its poll interval.
#[derive(Debug, Clone)]
pub struct SystemShutdownSignal {
    received: Arc<AtomicUsize>,
}

impl SystemShutdownSignal {
    /// Installs handlers for `SIGTERM`, `SIGINT`, `SIGQUIT` and `SIGHUP`.
    ///
    /// # Errors
    ///
    /// Returns [`ShutdownError::Install`] when a handler cannot be registered.
    pub fn install() -> Result<Self, ShutdownError> {
        let received = Arc::new(AtomicUsize::new(0));
        for signal in [SIGTERM, SIGINT, SIGQUIT, SIGHUP] {
            let value = usize::try_from(signal).map_err(|_| ShutdownError::Install {
                source: io::Error::from(io::ErrorKind::InvalidInput),
            })?;
            flag::register_usize(signal, Arc::clone(&received), value)
                .map_err(|source| ShutdownError::Install { source })?;
        }
        Ok(Self { received })
    }

    /// Number of the signal that requested shutdown, if any.
    #[must_use]
    pub fn received(&self) -> Option<i32> {
        match self.received.load(Ordering::SeqCst) {
            0 => None,
            signal => i32::try_from(signal).ok(),
        }
    }
}

impl ShutdownSignal for SystemShutdownSignal {
    fn requested(&self) -> bool {
        self.received.load(Ordering::SeqCst) != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_flag_reports_request() {
        let flag = Arc::new(AtomicBool::new(false));
        assert!(!flag.requested());
        flag.store(true, Ordering::SeqCst);
        assert!(flag.requested());
    }

    #[test]
    fn recorded_signal_is_reported() {
        let signal = SystemShutdownSignal {
            received: Arc::new(AtomicUsize::new(0)),
        };
        assert!(!signal.requested());

        signal
            .received
            .store(usize::try_from(SIGTERM).expect("positive"), Ordering::SeqCst);

        assert!(signal.requested());
        assert_eq!(signal.received(), Some(SIGTERM));
    }
}
