//! Per-connection bookkeeping for submitted jobs.

use std::os::fd::{AsFd, AsRawFd, RawFd};

use kmo_batch_protocol::Job;
use time::OffsetDateTime;

/// Connection types the scheduler can hold on behalf of a submitter.
///
/// The scheduler only ever writes to a held connection (the start signal) and
/// needs its descriptor to key the registry and the readiness watch set.
pub trait Connection: std::io::Write + AsFd {}

impl<T> Connection for T where T: std::io::Write + AsFd {}

/// Identifies a registered client without borrowing the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientHandle {
    descriptor: RawFd,
    sequence: u64,
}

impl ClientHandle {
    /// Descriptor of the held connection.
    #[must_use]
    pub const fn descriptor(&self) -> RawFd {
        self.descriptor
    }

    /// Arrival order assigned at submission.
    #[must_use]
    pub const fn sequence(&self) -> u64 {
        self.sequence
    }
}

/// A submitted job together with the connection that submitted it.
#[derive(Debug)]
pub struct Client<C> {
    connection: C,
    descriptor: RawFd,
    sequence: u64,
    job: Job,
    arrived_at: OffsetDateTime,
    admitted_at: Option<OffsetDateTime>,
}

impl<C: Connection> Client<C> {
    pub(crate) fn new(connection: C, sequence: u64, job: Job, arrived_at: OffsetDateTime) -> Self {
        let descriptor = connection.as_fd().as_raw_fd();
        Self {
            connection,
            descriptor,
            sequence,
            job,
            arrived_at,
            admitted_at: None,
        }
    }
}

impl<C> Client<C> {
    /// Handle naming this client.
    #[must_use]
    pub const fn handle(&self) -> ClientHandle {
        ClientHandle {
            descriptor: self.descriptor,
            sequence: self.sequence,
        }
    }

    /// Descriptor of the held connection.
    #[must_use]
    pub const fn descriptor(&self) -> RawFd {
        self.descriptor
    }

    /// Job descriptor received at submission.
    #[must_use]
    pub const fn job(&self) -> Job {
        self.job
    }

    /// When the job record was accepted.
    #[must_use]
    pub const fn arrived_at(&self) -> OffsetDateTime {
        self.arrived_at
    }

    /// When the job was admitted, if it has been.
    #[must_use]
    pub const fn admitted_at(&self) -> Option<OffsetDateTime> {
        self.admitted_at
    }

    pub(crate) fn mark_admitted(&mut self, at: OffsetDateTime) {
        self.admitted_at = Some(at);
    }

    pub(crate) fn connection(&self) -> &C {
        &self.connection
    }

    pub(crate) fn connection_mut(&mut self) -> &mut C {
        &mut self.connection
    }
}
