//! Capacity-gated promotion of pending jobs.

use std::num::NonZeroUsize;

use kmo_batch_protocol::{Command, write_command};
use time::OffsetDateTime;
use tracing::{info, warn};

use super::SCHEDULER_TARGET;
use super::client::{ClientHandle, Connection};
use super::registry::ClientRegistry;
use super::watch::WatchSet;

/// Outcome of one admission pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdmissionReport {
    /// Clients that received the start signal, oldest first.
    pub admitted: Vec<ClientHandle>,
    /// Clients whose start signal could not be delivered and were dropped.
    pub failed: Vec<ClientHandle>,
}

impl AdmissionReport {
    /// Returns true when the pass changed nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.admitted.is_empty() && self.failed.is_empty()
    }
}

/// Promotes pending jobs while the running set is below the ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdmissionController {
    max_jobs: NonZeroUsize,
}

impl AdmissionController {
    /// Builds a controller enforcing `max_jobs`.
    #[must_use]
    pub const fn new(max_jobs: NonZeroUsize) -> Self {
        Self { max_jobs }
    }

    /// Configured concurrency ceiling.
    #[must_use]
    pub const fn max_jobs(&self) -> NonZeroUsize {
        self.max_jobs
    }

    /// Returns true when another job may start.
    #[must_use]
    pub const fn has_capacity(&self, running: usize) -> bool {
        running < self.max_jobs.get()
    }

    /// Sends the start signal to pending clients in arrival order until the
    /// ceiling is reached or the queue is empty.
    ///
    /// A client whose signal cannot be written is closed without consuming a
    /// slot, and the pass moves on to the next pending client.
    pub fn run_pass<C, W>(
        &self,
        registry: &mut ClientRegistry<C, W>,
        now: OffsetDateTime,
    ) -> AdmissionReport
    where
        C: Connection,
        W: WatchSet,
    {
        let mut report = AdmissionReport::default();
        while self.has_capacity(registry.running_len()) {
            let Some(mut client) = registry.pop_front_pending() else {
                break;
            };
            match write_command(client.connection_mut(), Command::StartJob) {
                Ok(()) => {
                    let handle = registry.admit(client, now);
                    info!(
                        target: SCHEDULER_TARGET,
                        descriptor = handle.descriptor(),
                        sequence = handle.sequence(),
                        running = registry.running_len(),
                        max_jobs = self.max_jobs.get(),
                        "job admitted"
                    );
                    report.admitted.push(handle);
                }
                Err(error) => {
                    let handle = client.handle();
                    warn!(
                        target: SCHEDULER_TARGET,
                        descriptor = handle.descriptor(),
                        sequence = handle.sequence(),
                        error = %error,
                        "failed to deliver start signal; dropping job"
                    );
                    registry.release(client);
                    report.failed.push(handle);
                }
            }
        }
        report
    }
}
