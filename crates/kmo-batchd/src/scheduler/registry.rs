//! Ownership of submitted connections and their queue membership.
//!
//! Every client the registry holds is in exactly one of two collections: the
//! pending queue, ordered by arrival, or the running set. Its descriptor is in
//! the watch set for as long as the registry owns the connection, and the
//! connection is closed the moment the registry lets go of it.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::io;
use std::os::fd::RawFd;

use kmo_batch_protocol::Job;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::debug;

use super::SCHEDULER_TARGET;
use super::client::{Client, ClientHandle, Connection};
use super::snapshot::ListSnapshot;
use super::watch::WatchSet;

/// Collection a registered client currently belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Membership {
    /// Waiting for capacity.
    Pending,
    /// Admitted and counted against the ceiling.
    Running,
}

/// Errors raised when the registry refuses a submission.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The descriptor could not be added to the watch set.
    #[error("failed to watch descriptor {descriptor}: {source}")]
    Watch {
        /// Descriptor that could not be watched.
        descriptor: RawFd,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
}

/// Holds every submitted connection until it disconnects or fails.
#[derive(Debug)]
pub struct ClientRegistry<C, W> {
    clients: HashMap<RawFd, Client<C>>,
    pending: BTreeMap<u64, RawFd>,
    running: HashSet<RawFd>,
    next_sequence: u64,
    watch: W,
}

impl<C, W> ClientRegistry<C, W>
where
    C: Connection,
    W: WatchSet,
{
    /// Builds an empty registry reporting membership changes to `watch`.
    #[must_use]
    pub fn new(watch: W) -> Self {
        Self {
            clients: HashMap::new(),
            pending: BTreeMap::new(),
            running: HashSet::new(),
            next_sequence: 0,
            watch,
        }
    }

    /// Takes ownership of a connection that delivered a complete job record and
    /// appends it to the pending queue.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Watch`] when the descriptor cannot be watched.
    /// The connection is closed and no collection changes.
    pub fn submit(
        &mut self,
        connection: C,
        job: Job,
        arrived_at: OffsetDateTime,
    ) -> Result<ClientHandle, RegistryError> {
        let client = Client::new(connection, self.next_sequence, job, arrived_at);
        let descriptor = client.descriptor();
        self.watch
            .watch(client.connection().as_fd())
            .map_err(|source| RegistryError::Watch { descriptor, source })?;

        self.next_sequence = self.next_sequence.wrapping_add(1);
        let handle = client.handle();
        self.pending.insert(handle.sequence(), descriptor);
        self.clients.insert(descriptor, client);
        debug!(
            target: SCHEDULER_TARGET,
            descriptor,
            sequence = handle.sequence(),
            memory = job.memory(),
            pending = self.pending.len(),
            "job queued"
        );
        Ok(handle)
    }

    /// Forgets the client holding `descriptor`, unwatching and closing its
    /// connection.
    ///
    /// Returns the collection the client was removed from, or `None` when the
    /// descriptor is unknown. Repeated calls are harmless.
    pub fn drop_client(&mut self, descriptor: RawFd) -> Option<Membership> {
        let client = self.clients.remove(&descriptor)?;
        let membership = if self.running.remove(&descriptor) {
            Membership::Running
        } else {
            self.pending.remove(&client.handle().sequence());
            Membership::Pending
        };
        self.close(client);
        Some(membership)
    }

    /// Oldest pending client, if any.
    #[must_use]
    pub fn front_pending(&self) -> Option<&Client<C>> {
        self.pending
            .values()
            .next()
            .and_then(|descriptor| self.clients.get(descriptor))
    }

    /// Removes the oldest pending client from the queue.
    ///
    /// The connection stays watched; the caller must hand the client back via
    /// [`Self::admit`] or [`Self::release`].
    pub fn pop_front_pending(&mut self) -> Option<Client<C>> {
        let (_, descriptor) = self.pending.pop_first()?;
        self.clients.remove(&descriptor)
    }

    /// Records a client popped from the queue as running.
    pub fn admit(&mut self, mut client: Client<C>, admitted_at: OffsetDateTime) -> ClientHandle {
        client.mark_admitted(admitted_at);
        let handle = client.handle();
        self.running.insert(handle.descriptor());
        self.clients.insert(handle.descriptor(), client);
        handle
    }

    /// Unwatches and closes a client popped from the queue.
    pub fn release(&mut self, client: Client<C>) {
        self.close(client);
    }

    /// Number of clients waiting for capacity.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Number of admitted clients.
    #[must_use]
    pub fn running_len(&self) -> usize {
        self.running.len()
    }

    /// Collection holding `descriptor`, if registered.
    #[must_use]
    pub fn membership(&self, descriptor: RawFd) -> Option<Membership> {
        if self.running.contains(&descriptor) {
            Some(Membership::Running)
        } else if self.clients.contains_key(&descriptor) {
            Some(Membership::Pending)
        } else {
            None
        }
    }

    /// Pending clients in arrival order.
    pub fn pending(&self) -> impl Iterator<Item = &Client<C>> {
        self.pending
            .values()
            .filter_map(|descriptor| self.clients.get(descriptor))
    }

    /// Running clients in arrival order.
    #[must_use]
    pub fn running(&self) -> Vec<&Client<C>> {
        let mut running: Vec<&Client<C>> = self
            .running
            .iter()
            .filter_map(|descriptor| self.clients.get(descriptor))
            .collect();
        running.sort_by_key(|client| client.handle().sequence());
        running
    }

    /// Point-in-time listing of both collections.
    #[must_use]
    pub fn snapshot(&self) -> ListSnapshot {
        ListSnapshot::capture(self.pending(), self.running())
    }

    /// Watch set receiving membership changes.
    #[must_use]
    pub const fn watch_set(&self) -> &W {
        &self.watch
    }

    fn close(&mut self, client: Client<C>) {
        self.watch.unwatch(client.connection().as_fd());
        debug!(
            target: SCHEDULER_TARGET,
            descriptor = client.descriptor(),
            sequence = client.handle().sequence(),
            "connection closed"
        );
    }
}
