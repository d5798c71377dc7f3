//! Job admission state: who is waiting, who is running, and who starts next.
//!
//! [`Scheduler`] ties a [`ClientRegistry`] to an [`AdmissionController`]. The
//! event loop feeds it accepted submissions and hang-ups and asks it to run an
//! admission pass after each batch of readiness events. It never blocks and
//! never reads from a held connection.

mod admission;
mod client;
mod registry;
mod snapshot;
mod watch;

#[cfg(test)]
pub(crate) mod test_support;

use std::num::NonZeroUsize;
use std::os::fd::RawFd;

use kmo_batch_protocol::Job;
use time::OffsetDateTime;
use tracing::info;

pub use admission::{AdmissionController, AdmissionReport};
pub use client::{Client, ClientHandle, Connection};
pub use registry::{ClientRegistry, Membership, RegistryError};
pub use snapshot::{ListSnapshot, SnapshotEntry};
pub use watch::WatchSet;

pub(crate) const SCHEDULER_TARGET: &str = "kmo_batchd::scheduler";

/// Registry plus admission policy for one daemon instance.
#[derive(Debug)]
pub struct Scheduler<C, W> {
    registry: ClientRegistry<C, W>,
    admission: AdmissionController,
}

impl<C, W> Scheduler<C, W>
where
    C: Connection,
    W: WatchSet,
{
    /// Builds an empty scheduler enforcing `max_jobs`.
    #[must_use]
    pub fn new(max_jobs: NonZeroUsize, watch: W) -> Self {
        Self {
            registry: ClientRegistry::new(watch),
            admission: AdmissionController::new(max_jobs),
        }
    }

    /// Queues a job whose record arrived on `connection`.
    ///
    /// # Errors
    ///
    /// Propagates [`RegistryError`] when the connection cannot be held.
    pub fn submit(&mut self, connection: C, job: Job) -> Result<ClientHandle, RegistryError> {
        self.registry
            .submit(connection, job, OffsetDateTime::now_utc())
    }

    /// Handles a hang-up on `descriptor`.
    pub fn disconnect(&mut self, descriptor: RawFd) -> Option<Membership> {
        let membership = self.registry.drop_client(descriptor)?;
        info!(
            target: SCHEDULER_TARGET,
            descriptor,
            was = ?membership,
            pending = self.registry.pending_len(),
            running = self.registry.running_len(),
            "client disconnected"
        );
        Some(membership)
    }

    /// Starts as many pending jobs as capacity allows.
    pub fn admit_pending(&mut self) -> AdmissionReport {
        self.admission
            .run_pass(&mut self.registry, OffsetDateTime::now_utc())
    }

    /// Listing of both collections at this instant.
    #[must_use]
    pub fn snapshot(&self) -> ListSnapshot {
        self.registry.snapshot()
    }

    /// Read access to the underlying registry.
    #[must_use]
    pub const fn registry(&self) -> &ClientRegistry<C, W> {
        &self.registry
    }

    /// Configured concurrency ceiling.
    #[must_use]
    pub const fn max_jobs(&self) -> NonZeroUsize {
        self.admission.max_jobs()
    }
}
